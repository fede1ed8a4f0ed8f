//! Context handed to plugins during initialization.

use perch_core::AppConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::keymap::KeymapRegistry;

/// Everything a plugin may use while setting itself up.
#[derive(Clone)]
pub struct PluginContext {
    /// Directory the dashboard was started in.
    pub work_dir: PathBuf,

    /// Perch config directory, if the platform has one.
    pub config_dir: Option<PathBuf>,

    /// Shared keymap. Plugins may add their own bindings.
    pub keymap: Arc<KeymapRegistry>,

    /// Runtime for spawning adapters.
    pub runtime: Handle,

    /// Loaded user configuration.
    pub config: Arc<AppConfig>,
}

impl PluginContext {
    /// Create a context with default configuration.
    pub fn new(work_dir: impl Into<PathBuf>, keymap: Arc<KeymapRegistry>, runtime: Handle) -> Self {
        Self {
            work_dir: work_dir.into(),
            config_dir: perch_core::config_dir(),
            keymap,
            runtime,
            config: Arc::new(AppConfig::default()),
        }
    }

    /// Attach loaded configuration.
    pub fn with_config(mut self, config: Arc<AppConfig>) -> Self {
        self.config = config;
        self
    }
}
