//! IO helpers for CLI operations.

pub mod config_loader;

pub use config_loader::{load_config, parse_config, ConfigLoadError};
