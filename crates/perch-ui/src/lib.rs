//! Terminal frontend for the Perch dashboard.
//!
//! This crate provides:
//! - Dashboard state and input dispatch
//! - Command palette with layered, fuzzy-filtered entries
//! - Text views and the render cache
//! - Effect runner and terminal main loop
//! - Built-in session monitor plugin

pub mod actions;
pub mod error;
pub mod keymap;
pub mod model;
pub mod palette;
pub mod plugins;
pub mod render_cache;
pub mod runtime;
pub mod terminal;
pub mod views;

// Re-export commonly used types
pub use actions::AppCommand;
pub use error::AppError;
pub use model::{Dashboard, InputMode, Overlay, Routed};
pub use palette::{Palette, PaletteEntry, PaletteOutcome};
pub use plugins::SessionMonitor;
pub use render_cache::RenderCache;
pub use runtime::EffectRunner;
pub use terminal::TerminalGuard;
