mod config;
pub mod database;
pub mod memory;
mod migrations;
mod traits;

pub use config::{Config, LoggingConfig, SessionConfig};
pub use database::Database;
pub use memory::MemoryStore;
pub use traits::{CompletionSink, RoutineSource};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the directory holding `routinely.db` and `config.toml`.
///
/// `ROUTINELY_DATA_DIR` wins when set. Otherwise `~/.config/routinely[-dev]/`
/// based on ROUTINELY_ENV; set ROUTINELY_ENV=dev to use the development
/// data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("ROUTINELY_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("ROUTINELY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("routinely-dev")
            } else {
                base_dir.join("routinely")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
