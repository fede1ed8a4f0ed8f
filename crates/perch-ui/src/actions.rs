//! Application-level commands.
//!
//! These are executed by the dispatch loop itself rather than delivered to
//! a plugin.

/// A command the dispatch loop handles directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Quit,
    NextPlugin,
    PrevPlugin,
    /// Focus the plugin at this zero-based index.
    FocusPlugin(usize),
    ToggleHelp,
    ToggleDiagnostics,
    ToggleFooter,
    OpenPalette,
}

// =============================================================================
// Action Lookup
// =============================================================================

/// Look up an app command by its command ID.
pub fn action_from_name(name: &str) -> Option<AppCommand> {
    match name {
        "quit" => Some(AppCommand::Quit),
        "next-plugin" => Some(AppCommand::NextPlugin),
        "prev-plugin" => Some(AppCommand::PrevPlugin),
        "toggle-help" => Some(AppCommand::ToggleHelp),
        "toggle-diagnostics" => Some(AppCommand::ToggleDiagnostics),
        "toggle-footer" => Some(AppCommand::ToggleFooter),
        "open-palette" => Some(AppCommand::OpenPalette),
        _ => {
            let n: usize = name.strip_prefix("focus-plugin-")?.parse().ok()?;
            (1..=9).contains(&n).then(|| AppCommand::FocusPlugin(n - 1))
        }
    }
}

/// All app command IDs, for the help overlay.
pub fn available_actions() -> &'static [&'static str] {
    &[
        "quit",
        "next-plugin",
        "prev-plugin",
        "focus-plugin-1",
        "toggle-help",
        "toggle-diagnostics",
        "toggle-footer",
        "open-palette",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_name() {
        assert_eq!(action_from_name("quit"), Some(AppCommand::Quit));
        assert_eq!(
            action_from_name("focus-plugin-3"),
            Some(AppCommand::FocusPlugin(2))
        );
        assert_eq!(action_from_name("focus-plugin-0"), None);
        assert_eq!(action_from_name("focus-plugin-x"), None);
        assert_eq!(action_from_name("stage-file"), None);
    }

    #[test]
    fn test_available_actions_all_resolve() {
        for name in available_actions() {
            assert!(action_from_name(name).is_some(), "{} should resolve", name);
        }
    }
}
