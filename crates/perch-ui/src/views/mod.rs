//! Text views.
//!
//! Every view renders to a `String` of newline-separated lines; the terminal
//! layer only positions and clips them.

pub mod dashboard_view;
pub mod diagnostics_view;
pub mod help;
pub mod palette_view;
