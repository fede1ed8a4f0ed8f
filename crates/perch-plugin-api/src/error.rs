//! Error types for the Plugin API.
//!
//! Plugin initialization returns `Result<(), PluginError>`; anything that
//! fails there makes the plugin unavailable for the rest of the session.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for plugin initialization.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin could not set itself up.
    #[error("{0}")]
    Init(String),

    /// A required external resource could not be watched.
    #[error("Resource unavailable: {0}")]
    Resource(#[from] AdapterError),

    /// Another plugin already registered this ID.
    #[error("duplicate plugin id")]
    DuplicateId,
}

/// Errors raised while constructing an adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The directory to watch does not exist.
    #[error("Watch target not found: {0:?}")]
    TargetMissing(PathBuf),

    /// The OS watch could not be established.
    #[error("Watch failed: {0}")]
    Watch(#[from] notify::Error),
}

/// Result type alias for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
