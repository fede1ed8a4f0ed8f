//! Errors surfaced by the terminal frontend.

use perch_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Terminal or log file IO failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No platform directory for config or state.
    #[error("No {0} directory available on this platform")]
    NoDirectory(&'static str),
}
