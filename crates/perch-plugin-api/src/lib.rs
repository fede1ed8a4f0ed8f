//! Plugin API for the Perch dashboard.
//!
//! This crate provides the plugin system including:
//! - The `Plugin` capability trait and optional diagnostics capability
//! - Message/Effect types for asynchronous follow-up work
//! - Panic-isolated lifecycle calls via the plugin registry
//! - Context-scoped keybindings with a built-in default table
//! - Adapters turning filesystem notifications into debounced events

pub mod adapter;
pub mod context;
pub mod effect;
pub mod error;
pub mod guard;
pub mod keymap;
pub mod plugin;
pub mod registry;

// Re-export commonly used types
pub use adapter::{Adapter, AdapterKind, Event, EventKind, StatsSnapshot};
pub use context::PluginContext;
pub use effect::{Effect, Message};
pub use error::{AdapterError, PluginError, PluginResult};
pub use guard::{guarded, in_guarded_call, Phase, PluginFault};
pub use keymap::{KeymapRegistry, DEFAULT_BINDINGS};
pub use plugin::{Diagnostic, DiagnosticProvider, DiagnosticStatus, Plugin};
pub use registry::PluginRegistry;

// Re-export perch_core types for convenience
pub use perch_core::{Binding, Category, Command, GLOBAL_CONTEXT};
