//! Configuration loading and management.
//!
//! This module loads the console settings from `.crewmon/config.toml`,
//! applies environment overrides and validates the result.

pub mod error;
pub mod loader;

pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_api_url_override, load_config, validate, API_URL_ENV, CONFIG_DIR};
