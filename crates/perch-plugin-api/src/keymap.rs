//! Context-scoped keybindings.
//!
//! Bindings are grouped by context. Lookup walks a precedence chain, usually
//! `[focus context, plugin base context, "global"]`, and the first context
//! with an exact match wins. Contexts are never merged.
//!
//! Multi-stroke chords are written with a space between strokes ("g g").

use indexmap::IndexMap;
use parking_lot::RwLock;
use perch_core::{Binding, GLOBAL_CONTEXT};

// =============================================================================
// Defaults
// =============================================================================

/// Built-in bindings as (key, command, context).
pub const DEFAULT_BINDINGS: &[(&str, &str, &str)] = &[
    // Global
    ("q", "quit", GLOBAL_CONTEXT),
    ("ctrl+c", "quit", GLOBAL_CONTEXT),
    ("tab", "next-plugin", GLOBAL_CONTEXT),
    ("shift+tab", "prev-plugin", GLOBAL_CONTEXT),
    ("1", "focus-plugin-1", GLOBAL_CONTEXT),
    ("2", "focus-plugin-2", GLOBAL_CONTEXT),
    ("3", "focus-plugin-3", GLOBAL_CONTEXT),
    ("4", "focus-plugin-4", GLOBAL_CONTEXT),
    ("5", "focus-plugin-5", GLOBAL_CONTEXT),
    ("6", "focus-plugin-6", GLOBAL_CONTEXT),
    ("7", "focus-plugin-7", GLOBAL_CONTEXT),
    ("8", "focus-plugin-8", GLOBAL_CONTEXT),
    ("9", "focus-plugin-9", GLOBAL_CONTEXT),
    ("?", "toggle-help", GLOBAL_CONTEXT),
    ("!", "toggle-diagnostics", GLOBAL_CONTEXT),
    ("ctrl+h", "toggle-footer", GLOBAL_CONTEXT),
    ("r", "refresh", GLOBAL_CONTEXT),
    // Navigation
    ("j", "cursor-down", GLOBAL_CONTEXT),
    ("down", "cursor-down", GLOBAL_CONTEXT),
    ("k", "cursor-up", GLOBAL_CONTEXT),
    ("up", "cursor-up", GLOBAL_CONTEXT),
    ("g g", "cursor-top", GLOBAL_CONTEXT),
    ("G", "cursor-bottom", GLOBAL_CONTEXT),
    ("enter", "select", GLOBAL_CONTEXT),
    ("esc", "back", GLOBAL_CONTEXT),
    // Git status
    ("s", "stage-file", "git-status"),
    ("u", "unstage-file", "git-status"),
    ("d", "show-diff", "git-status"),
    ("D", "show-diff-staged", "git-status"),
    ("v", "toggle-diff-mode", "git-status"),
    // Task monitor
    ("a", "approve-issue", "td-monitor"),
    ("x", "delete-issue", "td-monitor"),
];

// =============================================================================
// Keymap Registry
// =============================================================================

/// Registry of bindings keyed by context.
///
/// Registering the same (key, context) twice replaces the earlier command,
/// keeping its position.
#[derive(Default)]
pub struct KeymapRegistry {
    /// Context -> bindings in registration order. Contexts keep first-seen order.
    contexts: RwLock<IndexMap<String, Vec<Binding>>>,
}

impl KeymapRegistry {
    /// Create a new empty keymap registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding [`DEFAULT_BINDINGS`].
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for (key, command, context) in DEFAULT_BINDINGS {
            registry.register_binding(Binding::new(*key, *command, *context));
        }
        registry
    }

    /// Add a binding. If the same (key, context) exists, its command is replaced.
    pub fn register_binding(&self, binding: Binding) {
        let mut contexts = self.contexts.write();
        let bindings = contexts.entry(binding.context.clone()).or_default();
        match bindings.iter_mut().find(|b| b.key == binding.key) {
            Some(existing) => {
                tracing::debug!(
                    "Rebinding {} in {}: {} -> {}",
                    binding.key,
                    binding.context,
                    existing.command,
                    binding.command
                );
                *existing = binding;
            }
            None => bindings.push(binding),
        }
    }

    /// Bindings registered for exactly `context`.
    pub fn bindings_for_context(&self, context: &str) -> Vec<Binding> {
        self.contexts
            .read()
            .get(context)
            .cloned()
            .unwrap_or_default()
    }

    /// Every context with at least one binding, in first-seen order.
    pub fn all_contexts(&self) -> Vec<String> {
        self.contexts
            .read()
            .iter()
            .filter(|(_, bindings)| !bindings.is_empty())
            .map(|(context, _)| context.clone())
            .collect()
    }

    /// Resolve `key` against the precedence chain.
    pub fn resolve(&self, key: &str, chain: &[&str]) -> Option<Binding> {
        let contexts = self.contexts.read();
        chain.iter().find_map(|context| {
            contexts
                .get(*context)
                .and_then(|bindings| bindings.iter().find(|b| b.key == key))
                .cloned()
        })
    }

    /// Whether `partial` is the start of a multi-stroke binding in the chain.
    pub fn is_prefix(&self, partial: &str, chain: &[&str]) -> bool {
        let prefix = format!("{} ", partial);
        let contexts = self.contexts.read();
        chain.iter().any(|context| {
            contexts
                .get(*context)
                .is_some_and(|bindings| bindings.iter().any(|b| b.key.starts_with(&prefix)))
        })
    }

    /// Delete a binding by key and context.
    ///
    /// Returns `true` if a binding was removed.
    pub fn remove(&self, key: &str, context: &str) -> bool {
        let mut contexts = self.contexts.write();
        let Some(bindings) = contexts.get_mut(context) else {
            return false;
        };
        let before = bindings.len();
        bindings.retain(|b| b.key != key);
        bindings.len() != before
    }

    /// Total number of bindings across contexts.
    pub fn binding_count(&self) -> usize {
        self.contexts.read().values().map(Vec::len).sum()
    }
}
