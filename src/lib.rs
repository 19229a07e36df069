//! Bridge between a dynamically typed host runtime and a native data store.
//!
//! The host never touches native objects directly. It holds opaque `u64`
//! tokens and invokes operations by command name (`"Class::method"`) with a
//! list of positional values. This crate resolves the name in a registry,
//! recovers typed arguments, runs the native operation and marshals the
//! result back, reporting every failure as a single `(identifier, message)`
//! pair.
//!
//! # Example
//!
//! ```
//! use nixmx::{HostValue, Options};
//!
//! fn main() -> Result<(), nixmx::HostError> {
//!     // Initialize once per process
//!     nixmx::startup(Options::default())?;
//!
//!     // Open a file and create a block in it
//!     let out = nixmx::nix_mx(
//!         1,
//!         &[
//!             HostValue::string("File::open"),
//!             HostValue::string("/tmp/nixmx-doc-example.nix"),
//!             HostValue::string("overwrite"),
//!         ],
//!     )?;
//!     let file = out[0].clone().unwrap_or(HostValue::Empty);
//!
//!     let out = nixmx::nix_mx(
//!         1,
//!         &[
//!             HostValue::string("File::createBlock"),
//!             file.clone(),
//!             HostValue::string("session"),
//!             HostValue::string("recording"),
//!         ],
//!     )?;
//!     let block = out[0].clone().unwrap_or(HostValue::Empty);
//!
//!     // Describe it as a struct
//!     let out = nixmx::nix_mx(1, &[HostValue::string("Block::describe"), block.clone()])?;
//!     let record = out[0].as_ref().and_then(HostValue::as_struct).map(|s| s.field(0, "name").cloned());
//!     assert_eq!(record, Some(Some(HostValue::string("session"))));
//!
//!     // Handles are released explicitly
//!     nixmx::nix_mx(0, &[HostValue::string("Entity::destroy"), block])?;
//!     nixmx::nix_mx(0, &[HostValue::string("Entity::destroy"), file])?;
//!     Ok(())
//! }
//! ```

pub mod bindings;
pub mod dispatch;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod registry;
pub mod store;
pub mod structs;
pub mod types;

// Re-export main types at the crate root
pub use dispatch::{nix_mx, startup, Dispatcher, Outputs, MAX_OUTPUTS};
pub use error::{Error, Result};
pub use ffi::{
    ClassId, Entity, Extractor, FromArg, Handle, HostError, HostValue, Infusor, StructArray,
    ToHost,
};
pub use registry::{ClassDef, Registry};
pub use structs::StructBuilder;
pub use types::Options;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings_cover_every_class() {
        let dispatcher = Dispatcher::with_default_bindings(Options::default()).unwrap();
        let registry = dispatcher.registry();
        for name in [
            "Entity::destroy",
            "Entity::updatedAt",
            "File::open",
            "File::describe",
            "Block::createDataArray",
            "Block::set_none_metadata",
            "DataArray::readAll",
            "DataArray::writeAll",
            "DataArray::dimensions",
            "Source::createSource",
            "Tag::createFeature",
            "Tag::set_none_units",
            "MultiTag::addPositions",
            "Section::createPropertyWithValue",
            "Section::properties",
            "Feature::openData",
            "Property::updateValues",
            "SetDimension::set_none_labels",
            "SampledDimension::position_at",
            "RangeDimension::tick_at",
        ] {
            assert!(registry.contains(name), "{} is not registered", name);
        }
    }

    #[test]
    fn test_startup_is_idempotent() {
        let first = startup(Options::default()).unwrap() as *const Dispatcher;
        let second = startup(Options {
            trace_dispatch: true,
            ..Default::default()
        })
        .unwrap() as *const Dispatcher;
        assert_eq!(first, second);
    }
}
