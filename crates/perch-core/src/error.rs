//! Error types shared across Perch crates.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config directory found.
    #[error("Config directory not found")]
    NoConfigDir,

    /// IO error while reading the config file.
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for our schema.
    #[error("Parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Version-check cache errors.
#[derive(Debug, Error)]
pub enum VersionError {
    /// Cache file could not be read or written.
    #[error("Version cache IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache file contents are not valid JSON.
    #[error("Version cache is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    /// The release source could not answer.
    #[error("Release lookup failed: {0}")]
    Fetch(String),
}
