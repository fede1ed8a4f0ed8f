//! Key chord strings.
//!
//! Terminal key events are turned into the same chord strings bindings are
//! written in ("q", "ctrl+c", "shift+tab", "pgdown"), so lookup is plain
//! string equality.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

// =============================================================================
// Keystroke Parsing
// =============================================================================

/// Normalize a user-written chord.
///
/// Accepts "ctrl-p", "Ctrl+P" and common aliases such as "escape" or
/// "return". Single printable characters keep their case so "G" and "g"
/// stay distinct.
pub fn normalize_keystroke(s: &str) -> String {
    s.split_whitespace()
        .map(normalize_stroke)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_stroke(stroke: &str) -> String {
    if stroke.chars().count() == 1 {
        return stroke.to_string();
    }

    let parts: Vec<&str> = stroke.split(['+', '-']).filter(|p| !p.is_empty()).collect();
    let Some((key, modifiers)) = parts.split_last() else {
        // Bare "+" or "-".
        return stroke.to_string();
    };

    let mut out: Vec<String> = modifiers
        .iter()
        .map(|m| match m.to_ascii_lowercase().as_str() {
            "control" | "ctl" => "ctrl".to_string(),
            "option" | "opt" | "meta" => "alt".to_string(),
            other => other.to_string(),
        })
        .collect();

    let key = if key.chars().count() == 1 {
        if out.iter().any(|m| m == "ctrl") {
            key.to_ascii_lowercase()
        } else {
            key.to_string()
        }
    } else {
        match key.to_ascii_lowercase().as_str() {
            "escape" => "esc".to_string(),
            "return" => "enter".to_string(),
            "pageup" => "pgup".to_string(),
            "pagedown" => "pgdown".to_string(),
            "del" => "delete".to_string(),
            other => other.to_string(),
        }
    };
    out.push(key);
    out.join("+")
}

// =============================================================================
// Terminal Events
// =============================================================================

/// Chord string for a terminal key event. Releases and unmapped keys yield
/// `None`.
pub fn chord_from_event(event: &KeyEvent) -> Option<String> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);
    let shift = event.modifiers.contains(KeyModifiers::SHIFT);

    let base = match event.code {
        KeyCode::Char(c) => {
            let c = if ctrl { c.to_ascii_lowercase() } else { c };
            let mut chord = String::new();
            if ctrl {
                chord.push_str("ctrl+");
            }
            if alt {
                chord.push_str("alt+");
            }
            chord.push(c);
            return Some(chord);
        }
        KeyCode::BackTab => return Some("shift+tab".to_string()),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::PageUp => "pgup".to_string(),
        KeyCode::PageDown => "pgdown".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::F(n) => format!("f{}", n),
        _ => return None,
    };

    let mut chord = String::new();
    if ctrl {
        chord.push_str("ctrl+");
    }
    if alt {
        chord.push_str("alt+");
    }
    if shift {
        chord.push_str("shift+");
    }
    chord.push_str(&base);
    Some(chord)
}
