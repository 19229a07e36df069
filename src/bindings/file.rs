//! `File::*` commands.

use super::seconds;
use crate::error::Result;
use crate::ffi::{ClassId, Extractor, FromArg, HostValue, Infusor};
use crate::registry::Registry;
use crate::store::{File, FileMode};
use crate::structs::StructBuilder;

fn describe(file: &File) -> Result<HostValue> {
    let mut sb = StructBuilder::new(
        &[1],
        &["format", "version", "location", "createdAt", "updatedAt"],
    );
    sb.set(file.format())
        .set(file.version())
        .set(file.location()?)
        .set(seconds(file.created_at()?))
        .set(seconds(file.updated_at()?));
    sb.array()
}

/// `File::open(path[, mode])`; mode is a name or a numeric code, read-write by default.
fn open(input: &Extractor<'_>, output: &mut Infusor) -> Result<()> {
    let path = input.str(1)?;
    let mode = if input.len() <= 2 {
        FileMode::ReadWrite
    } else if input.class_id(2)? == ClassId::Char {
        input.str(2)?.parse::<FileMode>()?
    } else {
        FileMode::from_code(usize::from_arg(input, 2)? as u64)?
    };
    output.set(0, File::open(&path, mode)?)
}

pub(super) fn register(registry: &mut Registry) -> Result<()> {
    registry
        .classdef::<File>("File")
        .desc(describe)
        .add("open", open)
        .getter("blocks", |f: &File| f.blocks())
        .getter("sections", |f: &File| f.sections())
        .remover("deleteBlock", |f: &File, key: &str| f.delete_block(key))
        .remover("deleteSection", |f: &File, key: &str| f.delete_section(key))
        .get_by("openBlock", |f: &File, key: &str| f.get_block(key))
        .get_by("openSection", |f: &File, key: &str| f.get_section(key))
        .method2("createBlock", |f: &File, name: String, ty: String| {
            f.create_block(name, ty)
        })
        .method2("createSection", |f: &File, name: String, ty: String| {
            f.create_section(name, ty)
        })
        .finish()
}
