//! Configuration types.
//!
//! All user configuration lives in `~/.config/perch/config.toml`. A missing
//! file is not an error: every section has defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::command::Binding;
use crate::error::ConfigError;

/// Runtime configuration loaded from config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Command palette settings.
    #[serde(default)]
    pub palette: PaletteConfig,

    /// User bindings, applied after the built-in defaults.
    #[serde(default)]
    pub keys: Vec<Binding>,

    /// Sources watched by the session monitor.
    #[serde(default)]
    pub sessions: Vec<SessionSource>,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Command palette configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteConfig {
    /// Chord that opens the palette from any pane, e.g. "ctrl+p".
    #[serde(default = "default_palette_key")]
    pub key: String,

    /// Entries visible at once before the list scrolls.
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
}

fn default_palette_key() -> String {
    "ctrl+p".to_string()
}

fn default_max_visible() -> usize {
    15
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            key: default_palette_key(),
            max_visible: default_max_visible(),
        }
    }
}

/// Kind of external resource a session source points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionSourceKind {
    /// A directory of `session-*.json` files.
    SessionDir,
    /// A SQLite database running in WAL mode.
    Database,
}

/// One watched source for the session monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSource {
    /// Display name, e.g. "gemini".
    pub name: String,

    /// What the path points at.
    pub kind: SessionSourceKind,

    /// Directory or database path. A leading `~` is expanded.
    pub path: PathBuf,
}

impl SessionSource {
    /// Path with a leading `~` replaced by the home directory.
    pub fn expanded_path(&self) -> PathBuf {
        expand_home(&self.path)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when neither PERCH_LOG nor RUST_LOG is set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Replace a leading `~` with the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("perch"))
}

/// Get the path to config.toml.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Directory for the log file. Falls back to the cache dir on platforms
/// without a state dir.
pub fn state_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map(|p| p.join("perch"))
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> std::io::Result<()> {
    if let Some(dir) = config_dir() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: AppConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(
            "Loaded config from {:?}: {} user bindings, {} session sources",
            path,
            config.keys.len(),
            config.sessions.len()
        );
        Ok(config)
    }

    /// Load from the default location.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        Self::load(&path)
    }
}
