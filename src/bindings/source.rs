//! `Source::*` commands.

use super::block::describe_named;
use crate::error::Result;
use crate::registry::Registry;
use crate::store::{NamedEntity, Source, WithMetadata};

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    registry
        .classdef::<Source>("Source")
        .desc(describe_named::<Source>)
        .method2("createSource", |s: &Source, name: String, ty: String| {
            s.create_source(name, ty)
        })
        .remover("deleteSource", |s: &Source, key: &str| s.delete_source(key))
        .getter("sources", |s: &Source| s.sources())
        .get_by("openSource", |s: &Source, key: &str| s.get_source(key))
        .getter("openMetadataSection", |s: &Source| s.metadata())
        .opt_setter("metadata", |s: &Source, key: Option<String>| {
            s.set_metadata(key)
        })
        .setter("set_type", |s: &Source, ty: String| s.set_type(ty))
        .opt_setter("definition", |s: &Source, d: Option<String>| {
            s.set_definition(d)
        })
        .finish()
}
