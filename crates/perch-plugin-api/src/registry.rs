//! Plugin Registry
//!
//! Owns the registered plugins and drives their lifecycle. A plugin that
//! fails or panics during init is recorded as unavailable and never retried;
//! panics in later calls are caught per call, logged, and replaced by a
//! fallback value. Callers reach plugin code only through this type.

use std::collections::BTreeMap;

use perch_core::{Command, GLOBAL_CONTEXT};

use crate::context::PluginContext;
use crate::effect::{Effect, Message};
use crate::error::PluginError;
use crate::guard::{guarded, Phase};
use crate::plugin::{Diagnostic, Plugin};

/// The plugin registry.
pub struct PluginRegistry {
    /// Context passed to every plugin's init.
    ctx: PluginContext,

    /// Active plugins in registration order.
    plugins: Vec<Box<dyn Plugin>>,

    /// Plugin ID -> reason it is unavailable.
    unavailable: BTreeMap<String, String>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new(ctx: PluginContext) -> Self {
        Self {
            ctx,
            plugins: Vec::new(),
            unavailable: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &PluginContext {
        &self.ctx
    }

    /// Initialize and add a plugin.
    ///
    /// Init failures are recorded, not returned; the plugin is left out of
    /// the active set. A second plugin with an ID already seen is dropped
    /// without touching the first one's state.
    pub fn register(&mut self, mut plugin: Box<dyn Plugin>) {
        let id = plugin.id().to_string();

        if self.position(&id).is_some() || self.unavailable.contains_key(&id) {
            tracing::warn!("Dropping plugin '{}': {}", id, PluginError::DuplicateId);
            return;
        }

        let ctx = &self.ctx;
        match guarded(&id, Phase::Init, || plugin.init(ctx)) {
            Ok(Ok(())) => {
                tracing::info!("Registered plugin '{}'", id);
                self.plugins.push(plugin);
            }
            Ok(Err(e)) => {
                tracing::warn!("Plugin '{}' unavailable: {}", id, e);
                self.unavailable.insert(id, e.to_string());
            }
            Err(fault) => {
                tracing::warn!("{}", fault);
                self.unavailable
                    .insert(id, format!("panic: {}", fault.message));
            }
        }
    }

    /// Start every active plugin, collecting their effects.
    pub fn start(&mut self) -> Vec<(String, Effect)> {
        let mut effects = Vec::new();
        for plugin in &mut self.plugins {
            let id = plugin.id().to_string();
            match guarded(&id, Phase::Start, || plugin.start()) {
                Ok(effect) => {
                    tracing::debug!("Started plugin '{}'", id);
                    if !effect.is_empty() {
                        effects.push((id, effect));
                    }
                }
                Err(fault) => tracing::warn!("{}", fault),
            }
        }
        effects
    }

    /// Stop every active plugin.
    pub fn stop(&mut self) {
        for plugin in &mut self.plugins {
            let id = plugin.id().to_string();
            match guarded(&id, Phase::Stop, || plugin.stop()) {
                Ok(()) => tracing::debug!("Stopped plugin '{}'", id),
                Err(fault) => tracing::warn!("{}", fault),
            }
        }
    }

    /// Deliver a message to one plugin.
    pub fn update(&mut self, id: &str, msg: Message) -> Effect {
        let Some(plugin) = self.get_mut(id) else {
            tracing::debug!("Dropping message for inactive plugin '{}'", id);
            return Effect::none();
        };
        guarded(id, Phase::Update, || plugin.update(msg)).unwrap_or_else(|fault| {
            tracing::warn!("{}", fault);
            Effect::none()
        })
    }

    /// Render one plugin. A panic renders a one-line fallback.
    pub fn view(&self, id: &str, width: u16, height: u16) -> String {
        let Some(plugin) = self.get(id) else {
            return String::new();
        };
        guarded(id, Phase::View, || plugin.view(width, height)).unwrap_or_else(|fault| {
            tracing::warn!("{}", fault);
            format!("[{} failed to render: {}]", id, fault.message)
        })
    }

    // =========================================================================
    // Guarded queries
    // =========================================================================

    /// Commands exported by every active plugin. A plugin that panics
    /// contributes none.
    pub fn commands(&self) -> Vec<Command> {
        self.plugins
            .iter()
            .flat_map(|plugin| {
                guarded(plugin.id(), Phase::Commands, || plugin.commands()).unwrap_or_else(
                    |fault| {
                        tracing::warn!("{}", fault);
                        Vec::new()
                    },
                )
            })
            .collect()
    }

    /// Focus and base context of the plugin at `index`.
    ///
    /// Both fall back to the global context if the plugin panics.
    pub fn contexts(&self, index: usize) -> Option<(String, String)> {
        let plugin = self.plugins.get(index)?;
        let contexts = guarded(plugin.id(), Phase::Context, || {
            (plugin.focus_context(), plugin.base_context())
        })
        .unwrap_or_else(|fault| {
            tracing::warn!("{}", fault);
            (GLOBAL_CONTEXT.to_string(), GLOBAL_CONTEXT.to_string())
        });
        Some(contexts)
    }

    /// ID of the first plugin whose base context is `context` or a
    /// dash-separated prefix of it (`git-status` owns `git-status-diff`).
    pub fn owner_of(&self, context: &str) -> Option<&str> {
        self.plugins
            .iter()
            .find(|plugin| {
                let base = guarded(plugin.id(), Phase::Context, || plugin.base_context())
                    .unwrap_or_else(|fault| {
                        tracing::warn!("{}", fault);
                        String::new()
                    });
                !base.is_empty()
                    && context
                        .strip_prefix(base.as_str())
                        .is_some_and(|rest| rest.is_empty() || rest.starts_with('-'))
            })
            .map(|plugin| plugin.id())
    }

    /// Tell the plugin at `index` whether it has focus.
    pub fn set_focused(&mut self, index: usize, focused: bool) {
        let Some(plugin) = self.plugins.get_mut(index) else {
            return;
        };
        let id = plugin.id().to_string();
        if let Err(fault) = guarded(&id, Phase::Focus, || plugin.set_focused(focused)) {
            tracing::warn!("{}", fault);
        }
    }

    /// Display name and icon of the plugin at `index`. A panic yields the
    /// plugin ID and no icon.
    pub fn label(&self, index: usize) -> Option<(String, String)> {
        let plugin = self.plugins.get(index)?;
        let label = guarded(plugin.id(), Phase::Describe, || {
            (plugin.name().to_string(), plugin.icon().to_string())
        })
        .unwrap_or_else(|fault| {
            tracing::warn!("{}", fault);
            (plugin.id().to_string(), String::new())
        });
        Some(label)
    }

    /// Diagnostics reported by the plugin at `index`. Empty when it has no
    /// provider or panics while reporting.
    pub fn diagnostics(&self, index: usize) -> Vec<Diagnostic> {
        let Some(plugin) = self.plugins.get(index) else {
            return Vec::new();
        };
        guarded(plugin.id(), Phase::Diagnostics, || {
            plugin
                .diagnostics()
                .map(|provider| provider.diagnostics())
                .unwrap_or_default()
        })
        .unwrap_or_else(|fault| {
            tracing::warn!("{}", fault);
            Vec::new()
        })
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Get an active plugin by ID.
    pub fn get(&self, id: &str) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|p| p.id() == id)
            .map(|p| p.as_ref())
    }

    /// Get an active plugin by ID, mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut dyn Plugin> {
        match self.plugins.iter_mut().find(|p| p.id() == id) {
            Some(p) => Some(p.as_mut()),
            None => None,
        }
    }

    /// Unavailable plugins and why, sorted by ID.
    pub fn unavailable(&self) -> &BTreeMap<String, String> {
        &self.unavailable
    }

    /// Active plugins in registration order.
    pub fn plugins(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(|p| p.as_ref())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Index of an active plugin.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.id() == id)
    }

    pub fn by_index(&self, index: usize) -> Option<&dyn Plugin> {
        self.plugins.get(index).map(|p| p.as_ref())
    }

    pub fn by_index_mut(&mut self, index: usize) -> Option<&mut dyn Plugin> {
        match self.plugins.get_mut(index) {
            Some(p) => Some(p.as_mut()),
            None => None,
        }
    }
}
