//! Errors raised while loading `.crewmon/config.toml`.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration could not be turned into a usable [`ConsoleConfig`].
///
/// A missing file is not an error; the defaults apply instead.
///
/// [`ConsoleConfig`]: cm_protocol::ConsoleConfig
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid TOML: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The file parsed but a setting is unusable.
    #[error("invalid setting in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },
}

impl ConfigError {
    /// File the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::FileRead { path, .. }
            | ConfigError::TomlParse { path, .. }
            | ConfigError::InvalidConfig { path, .. } => path,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
