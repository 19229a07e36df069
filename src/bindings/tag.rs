//! `Tag::*`, `MultiTag::*` and `Feature::*` commands.
//!
//! Reference, feature and position indices passed to the retrieve commands
//! are zero-based.

use super::block::describe_named;
use super::data_array::to_host_array;
use crate::error::Result;
use crate::ffi::{Entity, HostValue};
use crate::registry::{ClassDef, Registry};
use crate::store::{
    self, BaseTag, Feature, LinkType, MultiTag, NamedEntity, Source, Stored, Tag, WithMetadata,
    WithSources,
};
use crate::structs::StructBuilder;

fn describe_tag(tag: &Tag) -> Result<HostValue> {
    let mut sb = StructBuilder::new(
        &[1],
        &["id", "type", "name", "definition", "position", "extent", "units"],
    );
    sb.set(tag.id())
        .set(tag.type_name()?)
        .set(tag.name()?)
        .set(tag.definition()?)
        .set(tag.position()?)
        .set(tag.extent()?)
        .set(tag.units()?);
    sb.array()
}

fn describe_feature(feature: &Feature) -> Result<HostValue> {
    let mut sb = StructBuilder::new(&[1], &["id", "link_type"]);
    sb.set(feature.id()).set(feature.link_type()?.as_str());
    sb.array()
}

/// Commands shared by tags and multi-tags.
fn base_tag<T>(def: ClassDef<'_, T>) -> ClassDef<'_, T>
where
    T: Entity + BaseTag + NamedEntity + WithMetadata + WithSources,
{
    def.getter("references", |t: &T| t.references())
        .getter("features", |t: &T| t.features())
        .filtered("sources", |t: &T, accept: &dyn Fn(&Source) -> bool| {
            t.sources(accept)
        })
        .get_by("openFeature", |t: &T, key: &str| t.get_feature(key))
        .get_by("openSource", |t: &T, key: &str| t.get_source(key))
        .getter("openMetadataSection", |t: &T| t.metadata())
        .opt_setter("metadata", |t: &T, key: Option<String>| t.set_metadata(key))
        .setter("addReference", |t: &T, key: String| t.add_reference(key))
        .remover("removeReference", |t: &T, key: &str| t.remove_reference(key))
        .setter("addSource", |t: &T, key: String| t.add_source(key))
        .remover("removeSource", |t: &T, key: &str| t.remove_source(key))
        .method2(
            "createFeature",
            |t: &T, data: String, link: String| -> store::Result<Feature> {
                t.create_feature(&data, link.parse::<LinkType>()?)
            },
        )
        .remover("deleteFeature", |t: &T, key: &str| t.delete_feature(key))
}

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    base_tag(registry.classdef::<Tag>("Tag"))
        .desc(describe_tag)
        .get_by("openReferenceDataArray", |t: &Tag, key: &str| {
            t.get_reference(key)
        })
        .opt_setter("units", |t: &Tag, units: Option<Vec<String>>| {
            t.set_units(units)
        })
        .setter("set_type", |t: &Tag, ty: String| t.set_type(ty))
        .opt_setter("definition", |t: &Tag, d: Option<String>| {
            t.set_definition(d)
        })
        .setter("set_position", |t: &Tag, position: Vec<f64>| {
            t.set_position(position)
        })
        .setter("set_extent", |t: &Tag, extent: Vec<f64>| t.set_extent(extent))
        .method1("retrieveData", |t: &Tag, index: usize| -> Result<HostValue> {
            Ok(to_host_array(t.retrieve_data(index)?))
        })
        .method1(
            "featureRetrieveData",
            |t: &Tag, index: usize| -> Result<HostValue> {
                Ok(to_host_array(t.retrieve_feature_data(index)?))
            },
        )
        .finish()?;

    base_tag(registry.classdef::<MultiTag>("MultiTag"))
        .desc(describe_named::<MultiTag>)
        .getter("hasPositions", |m: &MultiTag| m.has_positions())
        .getter("openPositions", |m: &MultiTag| m.positions())
        .getter("openExtents", |m: &MultiTag| m.extents())
        .get_by("openReferences", |m: &MultiTag, key: &str| {
            m.get_reference(key)
        })
        .setter("addPositions", |m: &MultiTag, key: String| {
            m.set_positions(key)
        })
        .setter("addExtents", |m: &MultiTag, key: String| {
            m.set_extents(Some(key))
        })
        .method2(
            "retrieveData",
            |m: &MultiTag, position: usize, index: usize| -> Result<HostValue> {
                Ok(to_host_array(m.retrieve_data(position, index)?))
            },
        )
        .method2(
            "featureRetrieveData",
            |m: &MultiTag, position: usize, index: usize| -> Result<HostValue> {
                Ok(to_host_array(m.retrieve_feature_data(position, index)?))
            },
        )
        .finish()?;

    registry
        .classdef::<Feature>("Feature")
        .desc(describe_feature)
        .getter("openData", |f: &Feature| f.data())
        .finish()
}
