//! Panic isolation for plugin calls.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;

/// Lifecycle phase a fault happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Start,
    Stop,
    Update,
    View,
    /// Exporting palette commands.
    Commands,
    /// Reporting focus or base context.
    Context,
    /// Receiving a focus change.
    Focus,
    /// Reporting name or icon.
    Describe,
    Diagnostics,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::Start => "start",
            Phase::Stop => "stop",
            Phase::Update => "update",
            Phase::View => "view",
            Phase::Commands => "commands",
            Phase::Context => "context",
            Phase::Focus => "focus",
            Phase::Describe => "describe",
            Phase::Diagnostics => "diagnostics",
        };
        f.write_str(name)
    }
}

/// A plugin panicked.
#[derive(Debug, Clone, Error)]
#[error("plugin '{plugin}' panicked in {phase}: {message}")]
pub struct PluginFault {
    pub plugin: String,
    pub phase: Phase,
    pub message: String,
}

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Run `f`, converting a panic into a [`PluginFault`].
pub fn guarded<T>(plugin: &str, phase: Phase, f: impl FnOnce() -> T) -> Result<T, PluginFault> {
    DEPTH.with(|depth| depth.set(depth.get() + 1));
    let result = catch_unwind(AssertUnwindSafe(f));
    DEPTH.with(|depth| depth.set(depth.get() - 1));

    result.map_err(|payload| PluginFault {
        plugin: plugin.to_string(),
        phase,
        message: panic_message(payload.as_ref()),
    })
}

/// Whether the current thread is inside [`guarded`]. A panic hook uses this
/// to tell panics that will be caught from ones that end the process.
pub fn in_guarded_call() -> bool {
    DEPTH.with(|depth| depth.get() > 0)
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
