//! Keybinding help overlay.

use perch_core::GLOBAL_CONTEXT;
use perch_plugin_api::KeymapRegistry;
use unicode_width::UnicodeWidthStr;

use crate::actions::available_actions;

const KEY_WIDTH: usize = 12;

/// Bindings active for `chain`, most specific context first, followed by the
/// commands the dashboard itself handles.
pub fn render(keymap: &KeymapRegistry, chain: &[&str]) -> String {
    let mut lines = vec!["Keybindings".to_string(), String::new()];

    let mut seen: Vec<&str> = Vec::new();
    for context in chain {
        if seen.contains(context) {
            continue;
        }
        seen.push(*context);

        let bindings = keymap.bindings_for_context(context);
        if bindings.is_empty() {
            continue;
        }
        lines.push(format!("[{}]", context));
        for binding in bindings {
            let fill = KEY_WIDTH.saturating_sub(binding.key.width());
            lines.push(format!("  {}{} {}", binding.key, " ".repeat(fill), binding.command));
        }
        lines.push(String::new());
    }

    if !seen.contains(&GLOBAL_CONTEXT) {
        lines.push(format!("(no {} bindings)", GLOBAL_CONTEXT));
        lines.push(String::new());
    }

    lines.push("Dashboard commands".to_string());
    lines.push(format!("  {}", available_actions().join(", ")));
    lines.push(String::new());
    lines.push("esc, ? or ! closes this view".to_string());

    lines.join("\n")
}
