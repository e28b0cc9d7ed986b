//! Logging initialization for the CLI.
//!
//! Logs go to stderr so stdout stays machine-readable JSON.

use routinely_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pick the filter: `RUST_LOG` first, then `--debug`, then `logging.level`
/// from the config file.
fn filter(debug_override: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if debug_override {
        "debug".to_string()
    } else {
        Config::load_or_default().logging.level
    };
    EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_logging(debug_override: bool) {
    let result = tracing_subscriber::registry()
        .with(filter(debug_override))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();

    if let Err(e) = result {
        eprintln!("warning: logging not initialised: {e}");
    }
}
