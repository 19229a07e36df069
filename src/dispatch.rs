//! Host entry point.
//!
//! The process-wide dispatcher moves through three states:
//!
//! - *Uninitialized*: [`nix_mx`] reports [`Error::NotInitialized`].
//! - *Initializing*: the first [`startup`] call installs logging and builds
//!   the registry; concurrent callers block until it finishes.
//! - *Ready*: the registry is read-only and lives until process exit.

use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::bindings;
use crate::error::{Error, Result};
use crate::ffi::{error_from_panic, Extractor, HostError, HostValue, Infusor};
use crate::logging::init_logging;
use crate::registry::Registry;
use crate::types::Options;

/// Result slots of a successful call, one per requested output.
pub type Outputs = Vec<Option<HostValue>>;

/// Largest number of outputs a single call may request.
pub const MAX_OUTPUTS: usize = 1024;

/// A registry plus the failure boundary around it.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Registry,
    options: Options,
}

impl Dispatcher {
    /// Wrap an already populated registry.
    pub fn new(registry: Registry, options: Options) -> Self {
        Self { registry, options }
    }

    /// Dispatcher with every data-store class registered.
    pub fn with_default_bindings(options: Options) -> Result<Self> {
        let mut registry = Registry::new();
        bindings::register_all(&mut registry)?;
        info!(commands = registry.len(), "command table ready");
        Ok(Self::new(registry, options))
    }

    /// The command table this dispatcher serves.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Options the dispatcher was created with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Run the command named by `rhs[0]` with `nlhs` requested outputs.
    ///
    /// Every failure, including a panic inside a command, is reported as one
    /// [`HostError`] and no outputs are returned.
    pub fn call(&self, nlhs: usize, rhs: &[HostValue]) -> std::result::Result<Outputs, HostError> {
        let input = Extractor::new(rhs);
        let command = input
            .str(0)
            .map_err(|err| HostError::from_error(None, &err))?;

        if nlhs > MAX_OUTPUTS {
            let err = Error::ArgumentShape(format!(
                "{} outputs requested, at most {} are supported",
                nlhs, MAX_OUTPUTS
            ));
            return Err(HostError::from_error(Some(&command), &err));
        }

        if self.options.trace_dispatch {
            debug!(command = %command, nlhs, nrhs = rhs.len(), "dispatching");
        }

        let mut output = Infusor::new(nlhs);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.registry.dispatch(&command, &input, &mut output)
        }))
        .unwrap_or_else(|payload| Err(error_from_panic(payload)));

        let result = match outcome {
            Ok(true) => Ok(output.into_slots()),
            Ok(false) => Err(Error::UnknownCommand(command.clone())),
            Err(err) => Err(err),
        };

        result.map_err(|err| {
            debug!(command = %command, error = %err, "command failed");
            HostError::from_error(Some(&command), &err)
        })
    }
}

static DISPATCHER: OnceLock<std::result::Result<Dispatcher, HostError>> = OnceLock::new();

/// Initialize logging and the process-wide dispatcher.
///
/// Only the first call's options take effect; later calls return the same
/// dispatcher, or the same initialization error.
pub fn startup(options: Options) -> std::result::Result<&'static Dispatcher, HostError> {
    DISPATCHER
        .get_or_init(|| {
            init_logging(&options);
            Dispatcher::with_default_bindings(options)
                .map_err(|err| HostError::from_error(None, &err))
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Host entry point: run `rhs[0]` on the process-wide dispatcher.
pub fn nix_mx(nlhs: usize, rhs: &[HostValue]) -> std::result::Result<Outputs, HostError> {
    match DISPATCHER.get() {
        Some(Ok(dispatcher)) => dispatcher.call(nlhs, rhs),
        Some(Err(err)) => Err(err.clone()),
        None => Err(HostError::from_error(None, &Error::NotInitialized)),
    }
}
