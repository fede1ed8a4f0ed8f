//! Plugin health overlay.

use perch_plugin_api::{DiagnosticStatus, PluginRegistry};

/// Active plugins, unavailable plugins with their reason, and whatever
/// diagnostics each active plugin reports.
pub fn render(registry: &PluginRegistry) -> String {
    let mut lines = vec!["Diagnostics".to_string(), String::new()];

    lines.push(format!("Plugins ({} active)", registry.len()));
    for (i, plugin) in registry.plugins().enumerate() {
        lines.push(format!(
            "  {} {}",
            DiagnosticStatus::Ok.symbol(),
            plugin.id()
        ));
        for diag in registry.diagnostics(i) {
            lines.push(format!(
                "      {} {}: {}",
                diag.status.symbol(),
                diag.id,
                diag.detail
            ));
        }
    }

    let unavailable = registry.unavailable();
    if !unavailable.is_empty() {
        lines.push(String::new());
        lines.push(format!("Unavailable ({})", unavailable.len()));
        for (id, reason) in unavailable {
            lines.push(format!(
                "  {} {}: {}",
                DiagnosticStatus::Error.symbol(),
                id,
                reason
            ));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_plugin_api::{
        Diagnostic, DiagnosticProvider, Effect, KeymapRegistry, Message, Plugin, PluginContext,
        PluginError,
    };
    use std::sync::Arc;

    struct Reporter {
        id: &'static str,
        fail: bool,
        panic_in_report: bool,
    }

    impl DiagnosticProvider for Reporter {
        fn diagnostics(&self) -> Vec<Diagnostic> {
            if self.panic_in_report {
                panic!("report exploded");
            }
            vec![Diagnostic::new(
                "watch",
                DiagnosticStatus::Warning,
                "2 events dropped",
            )]
        }
    }

    impl Plugin for Reporter {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn init(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
            if self.fail {
                return Err(PluginError::Init("no sources".to_string()));
            }
            Ok(())
        }

        fn update(&mut self, _msg: Message) -> Effect {
            Effect::none()
        }

        fn view(&self, _width: u16, _height: u16) -> String {
            String::new()
        }

        fn is_focused(&self) -> bool {
            false
        }

        fn set_focused(&mut self, _focused: bool) {}

        fn diagnostics(&self) -> Option<&dyn DiagnosticProvider> {
            Some(self)
        }
    }

    fn registry(rt: &tokio::runtime::Runtime) -> PluginRegistry {
        let ctx = PluginContext::new(
            "/tmp",
            Arc::new(KeymapRegistry::new()),
            rt.handle().clone(),
        );
        PluginRegistry::new(ctx)
    }

    #[test]
    fn test_render_active_and_unavailable() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let mut registry = registry(&rt);
        registry.register(Box::new(Reporter {
            id: "sessions",
            fail: false,
            panic_in_report: false,
        }));
        registry.register(Box::new(Reporter {
            id: "broken",
            fail: true,
            panic_in_report: false,
        }));

        let text = render(&registry);
        assert!(text.contains("Plugins (1 active)"));
        assert!(text.contains("  ✓ sessions"));
        assert!(text.contains("      ! watch: 2 events dropped"));
        assert!(text.contains("Unavailable (1)"));
        assert!(text.contains("  ✗ broken: no sources"));
    }

    #[test]
    fn test_render_survives_panicking_report() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let mut registry = registry(&rt);
        registry.register(Box::new(Reporter {
            id: "flaky",
            fail: false,
            panic_in_report: true,
        }));
        registry.register(Box::new(Reporter {
            id: "sessions",
            fail: false,
            panic_in_report: false,
        }));

        let text = render(&registry);
        assert!(text.contains("Plugins (2 active)"));
        assert!(text.contains("  ✓ flaky"));
        assert!(text.contains("  ✓ sessions\n      ! watch: 2 events dropped"));
        assert_eq!(text.matches("watch:").count(), 1);
    }
}
