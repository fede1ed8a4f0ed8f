//! Command palette.
//!
//! A searchable list of every bound command, layered by relevance to the
//! focused pane. The model keeps a single cursor over the filtered list and
//! a scroll offset so only `max_visible` entries are drawn.

pub mod entries;
pub mod fuzzy;

pub use entries::{build_entries, determine_layer, format_command_id, infer_category, Layer, PaletteEntry};
pub use fuzzy::{filter_entries, fuzzy_match, MatchRange};

use perch_core::Command;
use perch_plugin_api::KeymapRegistry;
use unicode_segmentation::UnicodeSegmentation;

/// Longest query accepted, in characters.
pub const QUERY_LIMIT: usize = 50;

/// Visible entries before `set_size` is first called.
pub const DEFAULT_MAX_VISIBLE: usize = 15;

/// Result of feeding a key to the palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteOutcome {
    /// The key was handled; stay open.
    Consumed,
    /// Close without selecting.
    Close,
    /// An entry was chosen.
    Selected { command_id: String, context: String },
}

/// Palette state.
#[derive(Debug)]
pub struct Palette {
    query: String,
    all: Vec<PaletteEntry>,
    filtered: Vec<PaletteEntry>,
    cursor: usize,
    offset: usize,
    max_visible: usize,
    visible_cap: usize,
    width: u16,
    height: u16,
    active_context: String,
    plugin_context: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VISIBLE)
    }
}

impl Palette {
    pub fn new(max_visible: usize) -> Self {
        Self {
            query: String::new(),
            all: Vec::new(),
            filtered: Vec::new(),
            cursor: 0,
            offset: 0,
            max_visible: max_visible.max(1),
            visible_cap: max_visible.max(1),
            width: 0,
            height: 0,
            active_context: String::new(),
            plugin_context: String::new(),
        }
    }

    /// Rebuild entries for the given focus and reset query, cursor and scroll.
    pub fn open(
        &mut self,
        keymap: &KeymapRegistry,
        commands: &[Command],
        active_context: &str,
        plugin_context: &str,
    ) {
        self.active_context = active_context.to_string();
        self.plugin_context = plugin_context.to_string();
        self.all = build_entries(keymap, commands, active_context, plugin_context);
        self.query.clear();
        self.refilter();
        tracing::debug!(
            "Palette opened in {} ({} entries)",
            active_context,
            self.all.len()
        );
    }

    /// Drop query and entries.
    pub fn reset(&mut self) {
        self.query.clear();
        self.all.clear();
        self.filtered.clear();
        self.cursor = 0;
        self.offset = 0;
    }

    /// Recompute visible capacity for a `width` x `height` screen, never
    /// exceeding the capacity the palette was created with.
    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.max_visible = (usize::from(height).saturating_sub(10) / 2)
            .max(5)
            .min(self.visible_cap);
        self.move_cursor(0);
    }

    /// Handle one key chord.
    pub fn handle_key(&mut self, chord: &str) -> PaletteOutcome {
        let page = self.max_visible as isize;
        match chord {
            "esc" => PaletteOutcome::Close,
            "enter" => match self.selected_entry() {
                Some(entry) => PaletteOutcome::Selected {
                    command_id: entry.command_id.clone(),
                    context: entry.context.clone(),
                },
                None => PaletteOutcome::Close,
            },
            "up" | "ctrl+p" => {
                self.move_cursor(-1);
                PaletteOutcome::Consumed
            }
            "down" | "ctrl+n" => {
                self.move_cursor(1);
                PaletteOutcome::Consumed
            }
            "ctrl+u" | "pgup" => {
                self.move_cursor(-page);
                PaletteOutcome::Consumed
            }
            "ctrl+d" | "pgdown" => {
                self.move_cursor(page);
                PaletteOutcome::Consumed
            }
            "backspace" => {
                if let Some((idx, _)) = self.query.grapheme_indices(true).next_back() {
                    self.query.truncate(idx);
                    self.refilter();
                }
                PaletteOutcome::Consumed
            }
            _ => {
                let mut chars = chord.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if !c.is_control() => {
                        if self.query.chars().count() < QUERY_LIMIT {
                            self.query.push(c);
                            self.refilter();
                        }
                        PaletteOutcome::Consumed
                    }
                    _ => PaletteOutcome::Close,
                }
            }
        }
    }

    /// Move the cursor by `delta`, clamping, and scroll the minimum amount
    /// to keep it visible.
    pub fn move_cursor(&mut self, delta: isize) {
        let last = self.filtered.len().saturating_sub(1);
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);

        if self.cursor < self.offset {
            self.offset = self.cursor;
        }
        if self.cursor >= self.offset + self.max_visible {
            self.offset = self.cursor + 1 - self.max_visible;
        }
    }

    fn refilter(&mut self) {
        self.filtered = filter_entries(&self.all, &self.query);
        self.cursor = 0;
        self.offset = 0;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filtered(&self) -> &[PaletteEntry] {
        &self.filtered
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn max_visible(&self) -> usize {
        self.max_visible
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn active_context(&self) -> &str {
        &self.active_context
    }

    pub fn plugin_context(&self) -> &str {
        &self.plugin_context
    }

    pub fn selected_entry(&self) -> Option<&PaletteEntry> {
        self.filtered.get(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::Binding;

    fn keymap_with(count: usize) -> KeymapRegistry {
        let keymap = KeymapRegistry::new();
        for i in 0..count {
            keymap.register_binding(Binding::new(
                format!("f{}", i),
                format!("action-{:02}", i),
                "global",
            ));
        }
        keymap
    }

    fn open(count: usize, max_visible: usize) -> Palette {
        let mut palette = Palette::new(max_visible);
        palette.open(&keymap_with(count), &[], "global", "global");
        palette
    }

    fn assert_window(p: &Palette) {
        assert!(p.cursor() < p.filtered().len().max(1));
        assert!(p.offset() <= p.cursor());
        assert!(p.cursor() < p.offset() + p.max_visible());
    }

    #[test]
    fn test_cursor_clamps_and_scrolls_minimally() {
        let mut p = open(30, 10);
        p.move_cursor(-1);
        assert_eq!((p.cursor(), p.offset()), (0, 0));

        p.move_cursor(9);
        assert_eq!((p.cursor(), p.offset()), (9, 0));
        p.move_cursor(1);
        assert_eq!((p.cursor(), p.offset()), (10, 1));

        p.move_cursor(100);
        assert_eq!((p.cursor(), p.offset()), (29, 20));

        p.move_cursor(-15);
        assert_eq!((p.cursor(), p.offset()), (14, 14));
        assert_window(&p);
    }

    #[test]
    fn test_navigation_keys_keep_window_invariant() {
        let mut p = open(40, 7);
        for key in [
            "down", "ctrl+d", "ctrl+d", "pgdown", "up", "ctrl+u", "ctrl+n", "pgup", "ctrl+p",
            "ctrl+d", "ctrl+d", "ctrl+d", "ctrl+d", "ctrl+d", "ctrl+d", "up",
        ] {
            assert_eq!(p.handle_key(key), PaletteOutcome::Consumed);
            assert_window(&p);
        }
        assert_eq!(p.cursor(), 38);
    }

    #[test]
    fn test_empty_list_navigation() {
        let mut p = open(0, 5);
        p.move_cursor(3);
        assert_eq!((p.cursor(), p.offset()), (0, 0));
        assert_eq!(p.handle_key("enter"), PaletteOutcome::Close);
    }

    #[test]
    fn test_typing_filters_and_resets_cursor() {
        let mut p = open(20, 5);
        p.move_cursor(12);
        assert_eq!(p.handle_key("1"), PaletteOutcome::Consumed);
        assert_eq!(p.query(), "1");
        assert_eq!((p.cursor(), p.offset()), (0, 0));
        // "Action 01" and "Action 10".."Action 19"
        assert_eq!(p.filtered().len(), 11);

        assert_eq!(p.handle_key("backspace"), PaletteOutcome::Consumed);
        assert_eq!(p.query(), "");
        assert_eq!(p.filtered().len(), 20);
    }

    #[test]
    fn test_query_limit() {
        let mut p = open(1, 5);
        for _ in 0..60 {
            p.handle_key("a");
        }
        assert_eq!(p.query().chars().count(), QUERY_LIMIT);
    }

    #[test]
    fn test_select_and_close() {
        let mut p = open(3, 5);
        p.handle_key("down");
        assert_eq!(
            p.handle_key("enter"),
            PaletteOutcome::Selected {
                command_id: "action-01".to_string(),
                context: "global".to_string()
            }
        );
        assert_eq!(p.handle_key("esc"), PaletteOutcome::Close);
        assert_eq!(p.handle_key("tab"), PaletteOutcome::Close);
    }

    #[test]
    fn test_set_size() {
        let mut p = open(30, 15);
        p.set_size(80, 40);
        assert_eq!(p.max_visible(), 15);
        p.set_size(80, 12);
        assert_eq!(p.max_visible(), 5);
        p.set_size(80, 4);
        assert_eq!(p.max_visible(), 5);
    }

    #[test]
    fn test_set_size_respects_configured_capacity() {
        let mut p = open(30, 8);
        p.set_size(120, 60);
        assert_eq!(p.max_visible(), 8);
        p.move_cursor(20);
        assert_window(&p);

        let mut small = open(30, 3);
        small.set_size(80, 12);
        assert_eq!(small.max_visible(), 3);
    }
}
