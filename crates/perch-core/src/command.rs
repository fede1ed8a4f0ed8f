//! Command and binding types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Context name for bindings that apply everywhere.
pub const GLOBAL_CONTEXT: &str = "global";

/// Logical grouping of commands for palette display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Navigation,
    #[default]
    Actions,
    View,
    Search,
    Edit,
    Git,
    System,
}

impl Category {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Category::Navigation => "Navigation",
            Category::Actions => "Actions",
            Category::View => "View",
            Category::Search => "Search",
            Category::Edit => "Edit",
            Category::Git => "Git",
            Category::System => "System",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A key chord bound to a command ID within a context.
///
/// Keys are not unique across contexts: "s" can mean one thing in
/// `git-status` and another in `td-monitor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Chord string, e.g. "ctrl+c", "G" or the two-stroke "g g".
    pub key: String,

    /// Command ID, e.g. "stage-file".
    pub command: String,

    /// Activation context, e.g. "global" or "git-status".
    #[serde(default = "default_context")]
    pub context: String,
}

fn default_context() -> String {
    GLOBAL_CONTEXT.to_string()
}

impl Binding {
    /// Create a binding.
    pub fn new(
        key: impl Into<String>,
        command: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            command: command.into(),
            context: context.into(),
        }
    }

    /// Whether this binding applies in every context.
    pub fn is_global(&self) -> bool {
        self.context == GLOBAL_CONTEXT
    }
}

/// A command exported by a plugin.
///
/// Plugins describe their commands so the palette can show a friendly name,
/// description and category instead of the raw ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Unique identifier (e.g., "stage-file").
    pub id: String,

    /// Short name (e.g., "Stage").
    pub name: String,

    /// Full description for the palette.
    pub description: String,

    /// Logical grouping.
    pub category: Category,

    /// Activation context.
    pub context: String,
}

impl Command {
    /// Create a command with an empty description in the `Actions` category.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: Category::default(),
            context: context.into(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }
}
