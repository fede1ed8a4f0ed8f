//! Full-screen dashboard layout.
//!
//! ```text
//! [1 Sessions]  2 Git
//! ────────────────────
//! <focused pane, palette or overlay>
//! ctrl+p palette  ? help  ! diagnostics  q quit
//! ```

use perch_core::GLOBAL_CONTEXT;
use unicode_width::UnicodeWidthStr;

use super::{diagnostics_view, help, palette_view};
use crate::model::{Dashboard, InputMode, Overlay};
use crate::render_cache::truncate;

/// Render the whole screen as exactly `height` lines.
pub fn render(dashboard: &Dashboard, styled: bool) -> String {
    let (width, height) = dashboard.size();
    let cols = usize::from(width);
    let rows = usize::from(height);

    let mut lines = vec![tab_bar(dashboard), "─".repeat(cols)];

    let footer = dashboard.show_footer().then(|| footer(dashboard));
    let body_rows = rows.saturating_sub(lines.len() + usize::from(footer.is_some()));

    let body = body(dashboard, width, body_rows as u16, styled);
    lines.extend(body.lines().take(body_rows).map(str::to_string));
    while lines.len() < rows.saturating_sub(usize::from(footer.is_some())) {
        lines.push(String::new());
    }
    lines.extend(footer);

    lines
        .iter()
        .take(rows)
        .map(|line| {
            // Styled palette lines carry escape codes; clipping them would cut
            // a sequence in half.
            if styled && dashboard.mode() == InputMode::PaletteOpen {
                line.clone()
            } else {
                truncate(line, cols).to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tab_bar(dashboard: &Dashboard) -> String {
    let registry = dashboard.registry();
    if registry.is_empty() {
        return "perch".to_string();
    }
    (0..registry.len())
        .filter_map(|i| registry.label(i).map(|label| (i, label)))
        .map(|(i, (name, icon))| {
            let label = if icon.is_empty() {
                format!("{} {}", i + 1, name)
            } else {
                format!("{} {} {}", i + 1, icon, name)
            };
            if i == dashboard.focused_index() {
                format!("[{}]", label)
            } else {
                format!(" {} ", label)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn body(dashboard: &Dashboard, width: u16, rows: u16, styled: bool) -> String {
    if dashboard.mode() == InputMode::PaletteOpen {
        return palette_view::render(dashboard.palette(), width, styled);
    }

    match dashboard.overlay() {
        Overlay::Help => {
            let (focus, base) = dashboard.focused_contexts();
            help::render(
                dashboard.keymap(),
                &[focus.as_str(), base.as_str(), GLOBAL_CONTEXT],
            )
        }
        Overlay::Diagnostics => diagnostics_view::render(dashboard.registry()),
        Overlay::None => match dashboard.focused_id() {
            Some(id) => {
                let content = dashboard.registry().view(&id, width, rows);
                dashboard
                    .render_cache()
                    .wrapped(&content, width)
                    .to_string()
            }
            None => "No active plugins. Press ! for diagnostics.".to_string(),
        },
    }
}

fn footer(dashboard: &Dashboard) -> String {
    let mut hints = format!(
        "{} palette  ? help  ! diagnostics  q quit",
        dashboard.palette_key()
    );
    if let Some(pending) = dashboard.pending_chord() {
        hints.push_str(&format!("  {} …", pending));
    }
    let unavailable = dashboard.registry().unavailable().len();
    if unavailable > 0 && hints.width() < usize::from(dashboard.size().0) {
        hints.push_str(&format!("  ({} unavailable)", unavailable));
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::PaletteConfig;
    use perch_plugin_api::{
        Effect, KeymapRegistry, Message, Plugin, PluginContext, PluginError, PluginRegistry,
    };
    use std::sync::Arc;

    struct Pane {
        id: &'static str,
        name: &'static str,
        fail: bool,
    }

    impl Plugin for Pane {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            if self.name.is_empty() {
                panic!("{} has no name", self.id);
            }
            self.name
        }

        fn init(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
            if self.fail {
                return Err(PluginError::Init("missing".to_string()));
            }
            Ok(())
        }

        fn update(&mut self, _msg: Message) -> Effect {
            Effect::none()
        }

        fn view(&self, width: u16, _height: u16) -> String {
            format!("{} pane {}", self.name, "x".repeat(usize::from(width)))
        }

        fn is_focused(&self) -> bool {
            false
        }

        fn set_focused(&mut self, _focused: bool) {}
    }

    fn dashboard() -> (tokio::runtime::Runtime, Dashboard) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let ctx = PluginContext::new(
            "/tmp",
            Arc::new(KeymapRegistry::with_defaults()),
            rt.handle().clone(),
        );
        let mut registry = PluginRegistry::new(ctx);
        for (id, name, fail) in [
            ("sessions", "Sessions", false),
            ("git-status", "Git", false),
            ("broken", "Broken", true),
        ] {
            registry.register(Box::new(Pane { id, name, fail }));
        }
        let mut dashboard = Dashboard::new(registry, &PaletteConfig::default());
        let _ = dashboard.resize(40, 8);
        (rt, dashboard)
    }

    #[test]
    fn test_layout() {
        let (_rt, d) = dashboard();
        let text = render(&d, false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(text.split('\n').count(), 8);
        assert_eq!(lines[0], "[1 Sessions]  2 Git ");
        assert_eq!(lines[1], "─".repeat(40));
        assert!(lines[2].starts_with("Sessions pane xx"));
        assert_eq!(lines[2].width(), 40);
        assert_eq!(
            text.split('\n').last().unwrap(),
            "ctrl+p palette  ? help  ! diagnostics  q"
        );
    }

    #[test]
    fn test_footer_hidden_and_pending_chord() {
        let (_rt, mut d) = dashboard();
        let _ = d.handle_key("g".to_string());
        assert!(footer(&d).contains("g …"));

        let _ = d.handle_key("ctrl+h".to_string());
        let text = render(&d, false);
        assert!(!text.contains("palette"));
        assert_eq!(text.split('\n').count(), 8);
    }

    #[test]
    fn test_overlays_replace_body() {
        let (_rt, mut d) = dashboard();
        let _ = d.resize(60, 40);

        let _ = d.handle_key("!".to_string());
        let text = render(&d, false);
        assert!(text.contains("✗ broken: missing"));
        assert!(!text.contains("Sessions pane"));

        let _ = d.handle_key("?".to_string());
        assert!(render(&d, false).contains("Keybindings"));

        let _ = d.handle_key("esc".to_string());
        let _ = d.handle_key("ctrl+p".to_string());
        assert!(render(&d, false).contains("[sessions]"));
    }

    #[test]
    fn test_tab_bar_falls_back_to_id() {
        let (_rt, d) = dashboard();
        let mut registry = PluginRegistry::new(d.registry().context().clone());
        registry.register(Box::new(Pane {
            id: "nameless",
            name: "",
            fail: false,
        }));
        registry.register(Box::new(Pane {
            id: "git-status",
            name: "Git",
            fail: false,
        }));
        let d = Dashboard::new(registry, &PaletteConfig::default());

        assert_eq!(tab_bar(&d), "[1 nameless]  2 Git ");
    }
}
