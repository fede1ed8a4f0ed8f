//! Input dispatch state machine.
//!
//! Every key goes through [`Dashboard::handle_key`]. In `Normal` mode it is
//! resolved against the focused plugin's contexts and `global`; app-level
//! commands run here, other commands go to the focused plugin, and unbound
//! keys fall through to it as raw chords. In `PaletteOpen` mode the palette
//! owns all input until it closes.

use std::sync::Arc;

use perch_core::{Binding, PaletteConfig, GLOBAL_CONTEXT};
use perch_plugin_api::{Effect, KeymapRegistry, Message, PluginRegistry};

use crate::actions::{action_from_name, AppCommand};
use crate::keymap::normalize_keystroke;
use crate::palette::{Palette, PaletteOutcome};
use crate::render_cache::RenderCache;

/// A message produced by an effect, addressed to the plugin that issued it.
#[derive(Debug)]
pub struct Routed {
    pub plugin_id: String,
    pub message: Message,
}

// =============================================================================
// Modes
// =============================================================================

/// Who receives key input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    /// The focused plugin receives unmatched input.
    #[default]
    Normal,
    /// The palette has exclusive input.
    PaletteOpen,
}

/// Full-screen overlay replacing the plugin pane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overlay {
    #[default]
    None,
    Help,
    Diagnostics,
}

/// Effects to spawn, tagged with the plugin that returned them.
pub type Effects = Vec<(String, Effect)>;

// =============================================================================
// Dashboard
// =============================================================================

/// Top-level UI state.
pub struct Dashboard {
    registry: PluginRegistry,
    keymap: Arc<KeymapRegistry>,
    palette: Palette,
    palette_key: String,
    render_cache: RenderCache,
    mode: InputMode,
    overlay: Overlay,
    focused: usize,
    /// Strokes of an unfinished multi-stroke chord.
    pending: Vec<String>,
    show_footer: bool,
    quit: bool,
    width: u16,
    height: u16,
}

impl Dashboard {
    pub fn new(registry: PluginRegistry, palette: &PaletteConfig) -> Self {
        let keymap = registry.context().keymap.clone();
        let mut dashboard = Self {
            registry,
            keymap,
            palette: Palette::new(palette.max_visible),
            palette_key: normalize_keystroke(&palette.key),
            render_cache: RenderCache::new(),
            mode: InputMode::Normal,
            overlay: Overlay::None,
            focused: 0,
            pending: Vec::new(),
            show_footer: true,
            quit: false,
            width: 80,
            height: 24,
        };
        dashboard.set_focus(0);
        dashboard
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start all plugins.
    pub fn start(&mut self) -> Effects {
        self.registry.start()
    }

    /// Stop all plugins.
    pub fn stop(&mut self) {
        self.registry.stop();
    }

    /// Start plugins, hand their effects to `body`, then stop plugins
    /// however `body` finished.
    pub fn session<T>(&mut self, body: impl FnOnce(&mut Self, Effects) -> T) -> T {
        let started = self.start();
        let outcome = body(self, started);
        self.stop();
        outcome
    }

    /// Record a new terminal size and tell every plugin.
    pub fn resize(&mut self, width: u16, height: u16) -> Effects {
        self.width = width;
        self.height = height;
        self.palette.set_size(width, height);

        let ids: Vec<String> = self.registry.plugins().map(|p| p.id().to_string()).collect();
        ids.into_iter()
            .map(|id| {
                let effect = self.registry.update(&id, Message::Resize { width, height });
                (id, effect)
            })
            .filter(|(_, effect)| !effect.is_empty())
            .collect()
    }

    /// Deliver an effect result to the plugin that issued it.
    pub fn deliver(&mut self, routed: Routed) -> Effects {
        self.send(routed.plugin_id, routed.message)
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Dispatch one key chord.
    pub fn handle_key(&mut self, chord: String) -> Effects {
        match self.mode {
            InputMode::PaletteOpen => self.handle_palette_key(&chord),
            InputMode::Normal => self.handle_normal_key(chord),
        }
    }

    fn handle_palette_key(&mut self, chord: &str) -> Effects {
        match self.palette.handle_key(chord) {
            PaletteOutcome::Consumed => Vec::new(),
            PaletteOutcome::Close => {
                self.close_palette();
                Vec::new()
            }
            PaletteOutcome::Selected {
                command_id,
                context,
            } => {
                self.close_palette();
                self.route_selection(command_id, context)
            }
        }
    }

    fn handle_normal_key(&mut self, chord: String) -> Effects {
        // The palette key wins over any half-typed chord.
        if chord == self.palette_key {
            self.open_palette();
            return Vec::new();
        }

        if self.overlay != Overlay::None && self.pending.is_empty() {
            match chord.as_str() {
                "esc" => {
                    self.overlay = Overlay::None;
                    return Vec::new();
                }
                "?" | "!" => {
                    let toggled = if chord == "?" {
                        Overlay::Help
                    } else {
                        Overlay::Diagnostics
                    };
                    self.overlay = if self.overlay == toggled {
                        Overlay::None
                    } else {
                        toggled
                    };
                    return Vec::new();
                }
                _ => {}
            }
        }

        let (focus_context, base_context) = self.focused_contexts();
        let chain = [focus_context.as_str(), base_context.as_str(), GLOBAL_CONTEXT];

        if !self.pending.is_empty() {
            let candidate = format!("{} {}", self.pending.join(" "), chord);
            if let Some(binding) = self.keymap.resolve(&candidate, &chain) {
                self.pending.clear();
                return self.execute(binding);
            }
            if self.keymap.is_prefix(&candidate, &chain) {
                self.pending.push(chord);
                return Vec::new();
            }
            tracing::debug!("Abandoned chord '{}'", candidate);
            self.pending.clear();
        }

        if let Some(binding) = self.keymap.resolve(&chord, &chain) {
            return self.execute(binding);
        }
        if self.keymap.is_prefix(&chord, &chain) {
            self.pending.push(chord);
            return Vec::new();
        }

        match self.focused_id() {
            Some(id) => self.send(id, Message::Key(chord)),
            None => Vec::new(),
        }
    }

    /// Run a resolved binding.
    fn execute(&mut self, binding: Binding) -> Effects {
        if let Some(command) = action_from_name(&binding.command) {
            self.run_app_command(command);
            return Vec::new();
        }
        match self.focused_id() {
            Some(id) => self.send(id, Message::command(binding.command, binding.context)),
            None => Vec::new(),
        }
    }

    /// Route a palette selection to the plugin owning its context.
    fn route_selection(&mut self, command_id: String, context: String) -> Effects {
        if let Some(command) = action_from_name(&command_id) {
            self.run_app_command(command);
            return Vec::new();
        }

        let owner = self.registry.owner_of(&context).map(str::to_string);

        match owner.or_else(|| self.focused_id()) {
            Some(id) => {
                tracing::debug!("Palette selected {} ({}) -> {}", command_id, context, id);
                self.send(id, Message::command(command_id, context))
            }
            None => Vec::new(),
        }
    }

    fn run_app_command(&mut self, command: AppCommand) {
        tracing::debug!("App command {:?}", command);
        let count = self.registry.len();
        match command {
            AppCommand::Quit => self.quit = true,
            AppCommand::NextPlugin if count > 0 => self.set_focus((self.focused + 1) % count),
            AppCommand::PrevPlugin if count > 0 => {
                self.set_focus((self.focused + count - 1) % count)
            }
            AppCommand::FocusPlugin(index) if index < count => self.set_focus(index),
            AppCommand::ToggleHelp => {
                self.overlay = match self.overlay {
                    Overlay::Help => Overlay::None,
                    _ => Overlay::Help,
                }
            }
            AppCommand::ToggleDiagnostics => {
                self.overlay = match self.overlay {
                    Overlay::Diagnostics => Overlay::None,
                    _ => Overlay::Diagnostics,
                }
            }
            AppCommand::ToggleFooter => self.show_footer = !self.show_footer,
            AppCommand::OpenPalette => self.open_palette(),
            _ => {}
        }
    }

    fn send(&mut self, plugin_id: String, message: Message) -> Effects {
        let effect = self.registry.update(&plugin_id, message);
        if effect.is_empty() {
            Vec::new()
        } else {
            vec![(plugin_id, effect)]
        }
    }

    // =========================================================================
    // Palette
    // =========================================================================

    fn open_palette(&mut self) {
        let (focus_context, base_context) = self.focused_contexts();
        let commands = self.registry.commands();
        self.pending.clear();
        self.palette
            .open(&self.keymap, &commands, &focus_context, &base_context);
        self.mode = InputMode::PaletteOpen;
    }

    fn close_palette(&mut self) {
        self.palette.reset();
        self.mode = InputMode::Normal;
    }

    // =========================================================================
    // Focus
    // =========================================================================

    fn set_focus(&mut self, index: usize) {
        if index >= self.registry.len() {
            return;
        }
        self.registry.set_focused(self.focused, false);
        self.registry.set_focused(index, true);
        self.focused = index;
    }

    /// (focus context, base context) of the focused plugin.
    pub fn focused_contexts(&self) -> (String, String) {
        self.registry
            .contexts(self.focused)
            .unwrap_or_else(|| (GLOBAL_CONTEXT.to_string(), GLOBAL_CONTEXT.to_string()))
    }

    pub fn focused_id(&self) -> Option<String> {
        self.registry
            .by_index(self.focused)
            .map(|p| p.id().to_string())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn keymap(&self) -> &KeymapRegistry {
        &self.keymap
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn render_cache(&self) -> &RenderCache {
        &self.render_cache
    }

    pub fn palette_key(&self) -> &str {
        &self.palette_key
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay
    }

    pub fn focused_index(&self) -> usize {
        self.focused
    }

    pub fn pending_chord(&self) -> Option<String> {
        (!self.pending.is_empty()).then(|| self.pending.join(" "))
    }

    pub fn show_footer(&self) -> bool {
        self.show_footer
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use perch_core::{Category, Command};
    use perch_plugin_api::{Plugin, PluginContext, PluginError};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Pane {
        id: &'static str,
        mode: Option<&'static str>,
        log: Log,
        focused: bool,
    }

    impl Plugin for Pane {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn init(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
            Ok(())
        }

        fn stop(&mut self) {
            self.log.lock().push(format!("{}:stop", self.id));
        }

        fn update(&mut self, msg: Message) -> Effect {
            let entry = match msg {
                Message::Key(k) => format!("{}:key:{}", self.id, k),
                Message::Command { id, context } => format!("{}:cmd:{}@{}", self.id, id, context),
                Message::Custom(_) => format!("{}:custom", self.id),
                _ => return Effect::none(),
            };
            self.log.lock().push(entry);
            Effect::none()
        }

        fn view(&self, _width: u16, _height: u16) -> String {
            String::new()
        }

        fn is_focused(&self) -> bool {
            self.focused
        }

        fn set_focused(&mut self, focused: bool) {
            self.focused = focused;
        }

        fn commands(&self) -> Vec<Command> {
            vec![Command::new("stage-file", "Stage", self.id).with_category(Category::Git)]
        }

        fn focus_context(&self) -> String {
            self.mode.unwrap_or(self.id).to_string()
        }
    }

    fn dashboard(log: &Log) -> (tokio::runtime::Runtime, Dashboard) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let keymap = Arc::new(KeymapRegistry::with_defaults());
        keymap.register_binding(Binding::new("n", "next-hunk", "git-diff"));
        let ctx = PluginContext::new("/tmp", keymap, rt.handle().clone());

        let mut registry = PluginRegistry::new(ctx);
        registry.register(Box::new(Pane {
            id: "git-status",
            mode: Some("git-diff"),
            log: log.clone(),
            focused: false,
        }));
        registry.register(Box::new(Pane {
            id: "td-monitor",
            mode: None,
            log: log.clone(),
            focused: false,
        }));

        (rt, Dashboard::new(registry, &PaletteConfig::default()))
    }

    fn keys(d: &mut Dashboard, chords: &[&str]) {
        for chord in chords {
            let _ = d.handle_key(chord.to_string());
        }
    }

    #[test]
    fn test_first_plugin_focused() {
        let log = Log::default();
        let (_rt, d) = dashboard(&log);
        assert_eq!(d.focused_id().as_deref(), Some("git-status"));
        assert!(d.registry().by_index(0).unwrap().is_focused());
        assert!(!d.registry().by_index(1).unwrap().is_focused());
    }

    #[test]
    fn test_resolution_precedence() {
        let log = Log::default();
        let (_rt, mut d) = dashboard(&log);

        // focus context, base context, then global
        keys(&mut d, &["n", "s", "j", "z"]);
        assert_eq!(
            *log.lock(),
            vec![
                "git-status:cmd:next-hunk@git-diff",
                "git-status:cmd:stage-file@git-status",
                "git-status:cmd:cursor-down@global",
                "git-status:key:z",
            ]
        );
    }

    #[test]
    fn test_app_commands_run_in_loop() {
        let log = Log::default();
        let (_rt, mut d) = dashboard(&log);

        keys(&mut d, &["tab"]);
        assert_eq!(d.focused_index(), 1);
        keys(&mut d, &["shift+tab", "shift+tab"]);
        assert_eq!(d.focused_index(), 1);
        keys(&mut d, &["1"]);
        assert_eq!(d.focused_index(), 0);
        keys(&mut d, &["9"]);
        assert_eq!(d.focused_index(), 0);

        keys(&mut d, &["ctrl+h"]);
        assert!(!d.show_footer());

        keys(&mut d, &["q"]);
        assert!(d.should_quit());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_multi_stroke_chord() {
        let log = Log::default();
        let (_rt, mut d) = dashboard(&log);

        keys(&mut d, &["g"]);
        assert_eq!(d.pending_chord().as_deref(), Some("g"));
        keys(&mut d, &["g"]);
        assert_eq!(d.pending_chord(), None);

        // An abandoned chord replays the new stroke on its own.
        keys(&mut d, &["g", "x"]);
        assert_eq!(
            *log.lock(),
            vec!["git-status:cmd:cursor-top@global", "git-status:key:x"]
        );
    }

    #[test]
    fn test_overlays() {
        let log = Log::default();
        let (_rt, mut d) = dashboard(&log);

        keys(&mut d, &["?"]);
        assert_eq!(d.overlay(), Overlay::Help);
        keys(&mut d, &["!"]);
        assert_eq!(d.overlay(), Overlay::Diagnostics);
        keys(&mut d, &["esc"]);
        assert_eq!(d.overlay(), Overlay::None);
        keys(&mut d, &["!", "!"]);
        assert_eq!(d.overlay(), Overlay::None);
    }

    #[test]
    fn test_palette_open_and_close() {
        let log = Log::default();
        let (_rt, mut d) = dashboard(&log);

        keys(&mut d, &["ctrl+p"]);
        assert_eq!(d.mode(), InputMode::PaletteOpen);
        assert_eq!(d.palette().active_context(), "git-diff");
        assert_eq!(d.palette().plugin_context(), "git-status");

        // Printable keys go to the query, not to bindings.
        keys(&mut d, &["q", "u"]);
        assert_eq!(d.palette().query(), "qu");
        assert!(!d.should_quit());

        keys(&mut d, &["esc"]);
        assert_eq!(d.mode(), InputMode::Normal);
        assert_eq!(d.palette().query(), "");

        keys(&mut d, &["ctrl+p", "tab"]);
        assert_eq!(d.mode(), InputMode::Normal);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_palette_selection_routes_to_owner() {
        let log = Log::default();
        let (_rt, mut d) = dashboard(&log);

        keys(&mut d, &["ctrl+p"]);
        for c in "approve".chars() {
            let _ = d.handle_key(c.to_string());
        }
        keys(&mut d, &["enter"]);

        assert_eq!(d.mode(), InputMode::Normal);
        assert_eq!(*log.lock(), vec!["td-monitor:cmd:approve-issue@td-monitor"]);
    }

    #[test]
    fn test_palette_selection_runs_app_command() {
        let log = Log::default();
        let (_rt, mut d) = dashboard(&log);

        keys(&mut d, &["ctrl+p"]);
        for c in "next plugin".chars() {
            let _ = d.handle_key(c.to_string());
        }
        keys(&mut d, &["enter"]);
        assert_eq!(d.focused_index(), 1);
    }

    #[test]
    fn test_palette_key_interrupts_pending_chord() {
        let log = Log::default();
        let (_rt, mut d) = dashboard(&log);

        keys(&mut d, &["g", "ctrl+p"]);
        assert_eq!(d.mode(), InputMode::PaletteOpen);
        assert_eq!(d.pending_chord(), None);
        assert!(log.lock().is_empty());
    }

    /// Panics in every query the dashboard makes outside update and view.
    struct Faulty;

    impl Plugin for Faulty {
        fn id(&self) -> &str {
            "faulty"
        }

        fn name(&self) -> &str {
            panic!("name exploded")
        }

        fn init(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
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

        fn set_focused(&mut self, _focused: bool) {
            panic!("set_focused exploded")
        }

        fn commands(&self) -> Vec<Command> {
            panic!("commands exploded")
        }

        fn focus_context(&self) -> String {
            panic!("focus_context exploded")
        }
    }

    #[test]
    fn test_panicking_plugin_queries_fall_back() {
        let log = Log::default();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let ctx = PluginContext::new(
            "/tmp",
            Arc::new(KeymapRegistry::with_defaults()),
            rt.handle().clone(),
        );
        let mut registry = PluginRegistry::new(ctx);
        registry.register(Box::new(Faulty));
        registry.register(Box::new(Pane {
            id: "td-monitor",
            mode: None,
            log: log.clone(),
            focused: false,
        }));
        let mut d = Dashboard::new(registry, &PaletteConfig::default());

        assert_eq!(
            d.focused_contexts(),
            (GLOBAL_CONTEXT.to_string(), GLOBAL_CONTEXT.to_string())
        );

        keys(&mut d, &["ctrl+p"]);
        assert_eq!(d.mode(), InputMode::PaletteOpen);
        assert_eq!(d.palette().active_context(), GLOBAL_CONTEXT);
        assert!(d
            .palette()
            .filtered()
            .iter()
            .any(|e| e.command_id == "stage-file" && e.name == "Stage"));

        keys(&mut d, &["esc", "tab"]);
        assert_eq!(d.mode(), InputMode::Normal);
        assert_eq!(d.focused_id().as_deref(), Some("td-monitor"));
        assert!(d.registry().by_index(1).unwrap().is_focused());
        assert_eq!(
            d.registry().label(0),
            Some(("faulty".to_string(), String::new()))
        );
    }

    #[test]
    fn test_session_stops_plugins_on_error() {
        let log = Log::default();
        let (_rt, mut d) = dashboard(&log);

        let outcome: Result<(), &str> = d.session(|d, started| {
            assert!(started.is_empty());
            let _ = d.handle_key("z".to_string());
            Err("terminal size unavailable")
        });

        assert_eq!(outcome, Err("terminal size unavailable"));
        assert_eq!(
            *log.lock(),
            vec!["git-status:key:z", "git-status:stop", "td-monitor:stop"]
        );
    }

    #[test]
    fn test_deliver_routes_to_issuer() {
        let log = Log::default();
        let (_rt, mut d) = dashboard(&log);

        let _ = d.deliver(Routed {
            plugin_id: "td-monitor".to_string(),
            message: Message::custom(()),
        });
        assert_eq!(*log.lock(), vec!["td-monitor:custom"]);
    }
}
