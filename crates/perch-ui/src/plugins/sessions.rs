//! Session activity monitor.
//!
//! Watches every configured `[[sessions]]` source and lists the most recently
//! active sessions. One listening effect per source is kept armed: each event
//! re-arms its source, and a closed stream leaves it disarmed.

use chrono::{DateTime, Local};
use perch_core::{Binding, Category, Command, SessionSourceKind};
use perch_plugin_api::{
    Adapter, AdapterKind, Diagnostic, DiagnosticProvider, DiagnosticStatus, Effect, Event,
    EventKind, Message, Plugin, PluginContext, PluginError,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub const PLUGIN_ID: &str = "sessions";

/// Sessions kept in the activity list.
pub const MAX_ACTIVITY: usize = 50;

/// Placeholder ID for events that don't name a session.
const UNKNOWN_SESSION: &str = "*";

// =============================================================================
// Types
// =============================================================================

/// One watched source.
struct Source {
    name: String,
    /// `None` once stopped.
    adapter: Option<Adapter>,
    events: Arc<Mutex<mpsc::Receiver<Event>>>,
}

/// Latest activity for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub source: String,
    pub session_id: String,
    pub kind: EventKind,
    /// Events seen for this session.
    pub count: u32,
    pub last_seen: DateTime<Local>,
}

/// Built-in plugin listing recent session activity.
#[derive(Default)]
pub struct SessionMonitor {
    sources: Vec<Source>,
    activity: VecDeque<Activity>,
    cursor: usize,
    focused: bool,
}

impl SessionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent first.
    pub fn activity(&self) -> &VecDeque<Activity> {
        &self.activity
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move `source`/`session` to the front, bumping its count.
    fn record(&mut self, source: &str, event: Event) {
        let session_id = event
            .session_id
            .unwrap_or_else(|| UNKNOWN_SESSION.to_string());

        let existing = self
            .activity
            .iter()
            .position(|a| a.source == source && a.session_id == session_id);

        let mut entry = match existing.and_then(|i| self.activity.remove(i)) {
            Some(entry) => entry,
            None => Activity {
                source: source.to_string(),
                session_id,
                kind: event.kind,
                count: 0,
                last_seen: Local::now(),
            },
        };
        entry.kind = event.kind;
        entry.count += 1;
        entry.last_seen = Local::now();

        self.activity.push_front(entry);
        self.activity.truncate(MAX_ACTIVITY);
        self.clamp_cursor();
    }

    fn move_cursor(&mut self, delta: isize) {
        self.cursor = self.cursor.saturating_add_signed(delta);
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.activity.len().saturating_sub(1));
    }

    /// Effect waiting for the next event from `source`, if it is still live.
    fn listen(&self, source: &str) -> Effect {
        let Some(src) = self
            .sources
            .iter()
            .find(|s| s.name == source && s.adapter.is_some())
        else {
            return Effect::none();
        };

        let name = src.name.clone();
        let events = src.events.clone();
        Effect::from_future(async move {
            let event = events.lock().await.recv().await;
            Message::Adapter {
                source: name,
                event,
            }
        })
    }
}

fn adapter_kind(kind: SessionSourceKind) -> AdapterKind {
    match kind {
        SessionSourceKind::SessionDir => AdapterKind::SessionDirectory,
        SessionSourceKind::Database => AdapterKind::WriteAheadDatabase,
    }
}

// =============================================================================
// Plugin
// =============================================================================

impl Plugin for SessionMonitor {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Sessions"
    }

    fn icon(&self) -> &str {
        "◉"
    }

    fn init(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        if ctx.config.sessions.is_empty() {
            return Err(PluginError::Init(
                "no session sources configured".to_string(),
            ));
        }

        for source in &ctx.config.sessions {
            let (adapter, events) = Adapter::watch(
                adapter_kind(source.kind),
                source.expanded_path(),
                &ctx.runtime,
            )?;
            self.sources.push(Source {
                name: source.name.clone(),
                adapter: Some(adapter),
                events: Arc::new(Mutex::new(events)),
            });
        }

        ctx.keymap
            .register_binding(Binding::new("c", "clear-activity", PLUGIN_ID));

        tracing::info!("Session monitor watching {} sources", self.sources.len());
        Ok(())
    }

    fn start(&mut self) -> Effect {
        let names: Vec<String> = self.sources.iter().map(|s| s.name.clone()).collect();
        Effect::batch(names.iter().map(|name| self.listen(name)))
    }

    fn stop(&mut self) {
        for source in &mut self.sources {
            if let Some(adapter) = source.adapter.take() {
                adapter.stop();
            }
        }
    }

    fn update(&mut self, msg: Message) -> Effect {
        match msg {
            Message::Adapter {
                source,
                event: Some(event),
            } => {
                tracing::debug!(
                    "{}: {} {:?}",
                    source,
                    event.kind.label(),
                    event.session_id
                );
                self.record(&source, event);
                self.listen(&source)
            }
            Message::Adapter {
                source,
                event: None,
            } => {
                tracing::debug!("{}: event stream ended", source);
                Effect::none()
            }
            Message::Command { id, .. } => {
                match id.as_str() {
                    "cursor-up" => self.move_cursor(-1),
                    "cursor-down" => self.move_cursor(1),
                    "cursor-top" => self.cursor = 0,
                    "cursor-bottom" => self.move_cursor(isize::MAX),
                    "refresh" | "clear-activity" => {
                        self.activity.clear();
                        self.cursor = 0;
                    }
                    _ => {}
                }
                Effect::none()
            }
            _ => Effect::none(),
        }
    }

    fn view(&self, _width: u16, height: u16) -> String {
        let mut lines = vec![format!(
            "Recent sessions ({} sources)",
            self.sources.len()
        )];
        lines.push(String::new());

        if self.activity.is_empty() {
            lines.push("Waiting for session activity…".to_string());
            return lines.join("\n");
        }

        let rows = usize::from(height).saturating_sub(lines.len()).max(1);
        let start = self.cursor.saturating_sub(rows - 1);
        for (i, a) in self.activity.iter().enumerate().skip(start).take(rows) {
            let marker = if i == self.cursor && self.focused {
                '›'
            } else {
                ' '
            };
            lines.push(format!(
                "{} {:<10} {:<24} {:<8} ×{:<4} {}",
                marker,
                a.source,
                a.session_id,
                a.kind.label(),
                a.count,
                a.last_seen.format("%H:%M:%S")
            ));
        }
        lines.join("\n")
    }

    fn is_focused(&self) -> bool {
        self.focused
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("clear-activity", "Clear", PLUGIN_ID)
                .with_description("Clear the recent activity list"),
            Command::new("refresh", "Refresh", PLUGIN_ID)
                .with_description("Reset the activity list")
                .with_category(Category::System),
        ]
    }

    fn diagnostics(&self) -> Option<&dyn DiagnosticProvider> {
        Some(self)
    }
}

impl DiagnosticProvider for SessionMonitor {
    fn diagnostics(&self) -> Vec<Diagnostic> {
        self.sources
            .iter()
            .map(|source| {
                let Some(adapter) = &source.adapter else {
                    return Diagnostic::new(&source.name, DiagnosticStatus::Warning, "stopped");
                };
                let stats = adapter.stats();
                let status = if stats.dropped > 0 || stats.watch_errors > 0 {
                    DiagnosticStatus::Warning
                } else {
                    DiagnosticStatus::Ok
                };
                Diagnostic::new(
                    &source.name,
                    status,
                    format!(
                        "{} emitted, {} dropped, {} watch errors ({})",
                        stats.emitted,
                        stats.dropped,
                        stats.watch_errors,
                        adapter.target().display()
                    ),
                )
            })
            .collect()
    }
}
