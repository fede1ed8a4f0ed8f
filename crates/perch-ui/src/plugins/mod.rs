//! Plugins shipped with the dashboard.

pub mod sessions;

pub use sessions::SessionMonitor;
