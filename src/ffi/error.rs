//! Error conversion for the host boundary.

use std::any::Any;
use std::fmt;

use crate::error::Error;

/// The `(identifier, message)` pair surfaced to the host on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError {
    /// Machine-readable identifier, e.g. `nix:arg:inval`.
    pub identifier: String,
    /// Human-readable message.
    pub message: String,
}

impl HostError {
    /// Report `err`, annotated with the failing command.
    pub fn from_error(command: Option<&str>, err: &Error) -> Self {
        let message = match command {
            Some(cmd) => format!("{}: {}", cmd, err),
            None => err.to_string(),
        };
        Self {
            identifier: err.identifier().to_string(),
            message,
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.identifier, self.message)
    }
}

impl std::error::Error for HostError {}

/// Convert a panic payload caught at the boundary into an error.
pub fn error_from_panic(payload: Box<dyn Any + Send>) -> Error {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    Error::Panicked(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotated_message() {
        let err = Error::UnknownCommand("NoSuch::Thing".into());
        let reported = HostError::from_error(Some("NoSuch::Thing"), &err);
        assert_eq!(reported.identifier, "nix:arg:dispatch");
        assert!(reported.message.starts_with("NoSuch::Thing: "));
    }

    #[test]
    fn test_panic_payloads() {
        let err = error_from_panic(Box::new("boom"));
        assert!(matches!(err, Error::Panicked(ref m) if m == "boom"));
        let err = error_from_panic(Box::new(String::from("bang")));
        assert!(matches!(err, Error::Panicked(ref m) if m == "bang"));
        let err = error_from_panic(Box::new(3u8));
        assert!(matches!(err, Error::Panicked(_)));
    }
}
