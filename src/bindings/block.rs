//! `Block::*` commands: the children of a block and their lifecycle.

use crate::error::{Error, Result};
use crate::ffi::{Extractor, HostValue, Infusor};
use crate::registry::Registry;
use crate::store::{Block, DataType, NamedEntity, WithMetadata};
use crate::structs::StructBuilder;

/// Record shared by blocks, sources and multi-tags.
pub(super) fn describe_named<E: NamedEntity>(entity: &E) -> Result<HostValue> {
    let mut sb = StructBuilder::new(&[1], &["id", "type", "name", "definition"]);
    sb.set(entity.id())
        .set(entity.type_name()?)
        .set(entity.name()?)
        .set(entity.definition()?);
    sb.array()
}

/// A shape given as a `uint64` row or as a `double` row of whole numbers.
fn extent(input: &Extractor<'_>, pos: usize) -> Result<Vec<usize>> {
    if let Some(values) = input.value(pos)?.numbers::<u64>() {
        return Ok(values.iter().map(|v| *v as usize).collect());
    }
    input
        .doubles(pos)?
        .into_iter()
        .map(|v| {
            if v >= 0.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(Error::ArgumentShape(format!(
                    "shape entries must be non-negative integers, got {}",
                    v
                )))
            }
        })
        .collect()
}

/// `Block::createDataArray(block, name, type, dtype, shape)`
fn create_data_array(input: &Extractor<'_>, output: &mut Infusor) -> Result<()> {
    let block = input.entity::<Block>(1)?;
    let name = input.str(2)?;
    let ty = input.str(3)?;
    let dtype = input.str(4)?.parse::<DataType>()?;
    let shape = extent(input, 5)?;
    output.set(0, block.create_data_array(name, ty, dtype, shape)?)
}

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    registry
        .classdef::<Block>("Block")
        .desc(describe_named::<Block>)
        .method2("createSource", |b: &Block, name: String, ty: String| {
            b.create_source(name, ty)
        })
        .method3(
            "createTag",
            |b: &Block, name: String, ty: String, position: Vec<f64>| {
                b.create_tag(name, ty, position)
            },
        )
        .add("createDataArray", create_data_array)
        .method3(
            "createMultiTag",
            |b: &Block, name: String, ty: String, positions: String| {
                b.create_multi_tag(name, ty, &positions)
            },
        )
        .getter("dataArrays", |b: &Block| b.data_arrays())
        .getter("sources", |b: &Block| b.sources())
        .getter("tags", |b: &Block| b.tags())
        .getter("multiTags", |b: &Block| b.multi_tags())
        .get_by("hasTag", |b: &Block, key: &str| b.has_tag(key))
        .get_by("hasMultiTag", |b: &Block, key: &str| b.has_multi_tag(key))
        .get_by("openDataArray", |b: &Block, key: &str| b.get_data_array(key))
        .get_by("openSource", |b: &Block, key: &str| b.get_source(key))
        .get_by("openTag", |b: &Block, key: &str| b.get_tag(key))
        .get_by("openMultiTag", |b: &Block, key: &str| b.get_multi_tag(key))
        .getter("openMetadataSection", |b: &Block| b.metadata())
        .opt_setter("metadata", |b: &Block, key: Option<String>| {
            b.set_metadata(key)
        })
        .remover("deleteDataArray", |b: &Block, key: &str| {
            b.delete_data_array(key)
        })
        .remover("deleteSource", |b: &Block, key: &str| b.delete_source(key))
        .remover("deleteTag", |b: &Block, key: &str| b.delete_tag(key))
        .remover("deleteMultiTag", |b: &Block, key: &str| {
            b.delete_multi_tag(key)
        })
        .setter("set_type", |b: &Block, ty: String| b.set_type(ty))
        .opt_setter("definition", |b: &Block, d: Option<String>| {
            b.set_definition(d)
        })
        .finish()
}
