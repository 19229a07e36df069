//! Host boundary: handles, argument and result views, and the value codec.
//!
//! Everything the host can observe passes through this module. Native
//! entities leave it only as `u64` tokens.

pub mod args;
pub mod convert;
pub mod error;
pub mod handles;
pub mod value;

pub use args::{Extractor, FromArg, Infusor};
pub use convert::ToHost;
pub use error::{error_from_panic, HostError};
pub use handles::{live_handles, Entity, Handle};
pub use value::{ClassId, HostValue, NumericArray, NumericData, Scalar, StructArray};
