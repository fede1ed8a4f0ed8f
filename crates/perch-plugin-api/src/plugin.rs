//! The plugin capability contract.

use perch_core::Command;

use crate::context::PluginContext;
use crate::effect::{Effect, Message};
use crate::error::PluginError;

/// A pane hosted by the dashboard.
///
/// The registry treats every plugin the same way: it only calls these
/// methods, each under a panic guard.
pub trait Plugin: Send {
    /// Stable identifier, e.g. "git-status".
    fn id(&self) -> &str;

    /// Display name for the tab bar.
    fn name(&self) -> &str;

    /// Single-glyph icon for the tab bar.
    fn icon(&self) -> &str {
        ""
    }

    /// Acquire resources. An error makes the plugin unavailable.
    fn init(&mut self, ctx: &PluginContext) -> Result<(), PluginError>;

    /// Begin background work.
    fn start(&mut self) -> Effect {
        Effect::none()
    }

    /// Release resources.
    fn stop(&mut self) {}

    /// Handle a message. Must not block.
    fn update(&mut self, msg: Message) -> Effect;

    /// Render into a `width` x `height` text block.
    fn view(&self, width: u16, height: u16) -> String;

    fn is_focused(&self) -> bool;

    fn set_focused(&mut self, focused: bool);

    /// Commands this plugin exports to the palette.
    fn commands(&self) -> Vec<Command> {
        Vec::new()
    }

    /// Active keybinding context. May be a mode sub-context such as
    /// "git-diff" while the base context is "git-status".
    fn focus_context(&self) -> String {
        self.base_context()
    }

    /// Context the plugin's own bindings live in.
    fn base_context(&self) -> String {
        self.id().to_string()
    }

    /// Diagnostics, for plugins that report them.
    fn diagnostics(&self) -> Option<&dyn DiagnosticProvider> {
        None
    }
}

/// Health of one diagnostic item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticStatus {
    Ok,
    Warning,
    Error,
}

impl DiagnosticStatus {
    pub fn symbol(self) -> &'static str {
        match self {
            DiagnosticStatus::Ok => "✓",
            DiagnosticStatus::Warning => "!",
            DiagnosticStatus::Error => "✗",
        }
    }
}

/// One row of the diagnostics view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub id: String,
    pub status: DiagnosticStatus,
    pub detail: String,
}

impl Diagnostic {
    pub fn new(id: impl Into<String>, status: DiagnosticStatus, detail: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status,
            detail: detail.into(),
        }
    }
}

/// Optional capability: report health rows for the diagnostics view.
pub trait DiagnosticProvider {
    fn diagnostics(&self) -> Vec<Diagnostic>;
}
