//! Core types for the Perch dashboard.
//!
//! This crate contains shared data structures that are used across all Perch crates:
//! - Binding and Command records
//! - Command categories
//! - Configuration types
//! - Version-check cache
//! - Error types

mod command;
mod config;
mod error;
pub mod version;

pub use command::{Binding, Category, Command, GLOBAL_CONTEXT};
pub use config::{
    config_dir, config_path, ensure_config_dir, expand_home, state_dir, AppConfig, LogConfig,
    PaletteConfig, SessionSource, SessionSourceKind,
};
pub use error::{ConfigError, VersionError};
