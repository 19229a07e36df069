//! Error types for the nix-mx crate.

use thiserror::Error;

use crate::ffi::value::ClassId;
use crate::store;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Wrong number of arguments or wrong positional type classes.
    #[error("wrong number or types of arguments: {0}")]
    ArgumentShape(String),

    /// A positional argument does not hold the expected kind of value.
    #[error("argument {pos} must be {expected}, got {found}")]
    ArgumentType {
        /// Argument position.
        pos: usize,
        /// Class the extraction expected.
        expected: ClassId,
        /// Class actually passed by the host.
        found: ClassId,
    },

    /// A result was written past the declared number of outputs.
    #[error("output {pos} exceeds the {bound} requested output(s)")]
    OutputOverflow {
        /// Output position.
        pos: usize,
        /// Number of output slots.
        bound: usize,
    },

    /// More values were assigned to a struct builder than it has fields.
    #[error("struct builder overflow: {assigned} values for {capacity} fields")]
    StructOverflow {
        /// Number of values assigned.
        assigned: usize,
        /// Number of fields across all records.
        capacity: usize,
    },

    /// Handle holds an entity of another class.
    #[error("tried to get a {expected} from a handle holding a {found}")]
    TypeMismatch {
        /// Requested class.
        expected: &'static str,
        /// Stored class.
        found: &'static str,
    },

    /// Handle was destroyed.
    #[error("called get on empty handle {0:#x}")]
    EmptyHandle(u64),

    /// Token never named a handle cell.
    #[error("invalid handle {0:#x}")]
    InvalidHandle(u64),

    /// No command is registered under the name.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A command with the same name is already registered.
    #[error("command '{0}' is already registered")]
    DuplicateCommand(String),

    /// The process-wide dispatcher has not been started.
    #[error("dispatcher not initialized; call nixmx::startup first")]
    NotInitialized,

    /// The data store rejected the operation.
    #[error(transparent)]
    Native(#[from] store::Error),

    /// A bound command panicked.
    #[error("unknown exception: {0}")]
    Panicked(String),
}

impl Error {
    /// Identifier reported to the host alongside the message.
    pub fn identifier(&self) -> &'static str {
        match self {
            Error::ArgumentShape(_) | Error::ArgumentType { .. } => "nix:arg:inval",
            Error::TypeMismatch { .. } => "nix:handle:type",
            Error::EmptyHandle(_) | Error::InvalidHandle(_) => "nix:handle:empty",
            _ => "nix:arg:dispatch",
        }
    }

    /// Check if this error comes from recovering a handle.
    pub fn is_handle_error(&self) -> bool {
        matches!(
            self,
            Error::TypeMismatch { .. } | Error::EmptyHandle(_) | Error::InvalidHandle(_)
        )
    }

    /// Check if this is an argument error.
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Error::ArgumentShape(_) | Error::ArgumentType { .. })
    }
}
