//! Logging setup.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::Options;

/// Install a stderr subscriber once per process.
///
/// `RUST_LOG` takes precedence over `options.log_filter`. Does nothing unless
/// `options.install_logger` is set, or if another global subscriber exists.
pub fn init_logging(options: &Options) {
    static INITIALISED: OnceLock<()> = OnceLock::new();

    if !options.install_logger {
        return;
    }

    INITIALISED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&options.log_filter));
        let subscriber = fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
