//! Configuration types.

use std::env;

/// Environment variable enabling dispatch tracing and the stderr logger.
pub const DEBUG_ENV: &str = "NIXMX_DEBUG";

/// Environment variable holding the default log filter directive.
pub const LOG_ENV: &str = "NIXMX_LOG";

/// Options for starting the dispatcher.
#[derive(Debug, Clone)]
pub struct Options {
    /// Log every processed command at debug level.
    pub trace_dispatch: bool,
    /// Install a stderr `tracing` subscriber at startup.
    pub install_logger: bool,
    /// Filter directive used when `RUST_LOG` is unset (e.g. "warn", "nixmx=debug").
    pub log_filter: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            trace_dispatch: false,
            install_logger: false,
            log_filter: "warn".to_string(),
        }
    }
}

impl Options {
    /// Read options from `NIXMX_DEBUG` and `NIXMX_LOG`.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if env::var(DEBUG_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            opts.trace_dispatch = true;
            opts.install_logger = true;
            opts.log_filter = "debug".to_string();
        }
        if let Ok(filter) = env::var(LOG_ENV) {
            if !filter.trim().is_empty() {
                opts.install_logger = true;
                opts.log_filter = filter;
            }
        }
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = Options::default();
        assert!(!opts.trace_dispatch);
        assert!(!opts.install_logger);
        assert_eq!(opts.log_filter, "warn");
    }
}
