//! UI state model.

pub mod state;

pub use state::{Dashboard, InputMode, Overlay, Routed};
