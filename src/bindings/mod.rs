//! Command tables exposing the data store to the host.
//!
//! Each submodule registers one class (`"Class::method"` commands). The
//! universal `Entity::destroy` and `Entity::updatedAt` work on a handle of any
//! class.

mod block;
mod data_array;
mod dimension;
mod file;
mod section;
mod source;
mod tag;

use crate::error::Result;
use crate::ffi::{Entity, Extractor, Infusor};
use crate::registry::Registry;
use crate::store::{
    self, Block, DataArray, Feature, File, MultiTag, Property, RangeDimension, SampledDimension,
    Section, SetDimension, Source, Stored, Tag,
};

macro_rules! stored_entities {
    ($($ty:ty => $class:literal),+ $(,)?) => {
        $(
            impl Entity for $ty {
                const CLASS: &'static str = $class;

                fn updated_at(&self) -> store::Result<i64> {
                    Stored::updated_at(self)
                }
            }
        )+

        crate::entity_to_host!($($ty),+);
        crate::entity_from_arg!($($ty),+);
    };
}

stored_entities! {
    Block => "Block",
    DataArray => "DataArray",
    Source => "Source",
    Tag => "Tag",
    MultiTag => "MultiTag",
    Feature => "Feature",
    Section => "Section",
    Property => "Property",
    SetDimension => "SetDimension",
    SampledDimension => "SampledDimension",
    RangeDimension => "RangeDimension",
}

impl Entity for File {
    const CLASS: &'static str = "File";

    fn updated_at(&self) -> store::Result<i64> {
        File::updated_at(self)
    }
}

crate::entity_to_host!(File);
crate::entity_from_arg!(File);

/// Seconds since the epoch as reported to the host; pre-epoch times clamp to 0.
pub(crate) fn seconds(t: i64) -> u64 {
    u64::try_from(t).unwrap_or(0)
}

fn entity_destroy(input: &Extractor<'_>, _output: &mut Infusor) -> Result<()> {
    input.hdl(1)?.destroy()
}

fn entity_updated_at(input: &Extractor<'_>, output: &mut Infusor) -> Result<()> {
    let updated = input.hdl(1)?.updated_at()?;
    output.set(0, seconds(updated))
}

/// Register every class of the data store.
pub fn register_all(registry: &mut Registry) -> Result<()> {
    registry.add("Entity::destroy", entity_destroy)?;
    registry.add("Entity::updatedAt", entity_updated_at)?;

    file::register(registry)?;
    block::register(registry)?;
    data_array::register(registry)?;
    source::register(registry)?;
    tag::register(registry)?;
    section::register(registry)?;
    dimension::register(registry)?;
    Ok(())
}
