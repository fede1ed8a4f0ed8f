//! Command palette rendering.

use crossterm::style::Stylize;
use unicode_width::UnicodeWidthStr;

use crate::palette::{Layer, MatchRange, Palette, PaletteEntry};
use crate::render_cache::truncate;

const KEY_WIDTH: usize = 12;
const NAME_WIDTH: usize = 20;
const ESC_HINT: &str = "[esc]";

/// Render the palette for a screen `screen_width` columns wide.
///
/// With `styled` set, matched name characters are emphasized with ANSI
/// attributes.
pub fn render(palette: &Palette, screen_width: u16, styled: bool) -> String {
    let width = usize::from(screen_width).saturating_sub(4).clamp(40, 80);
    let mut lines = Vec::new();

    let prompt = format!("> {}", palette.query());
    let gap = width.saturating_sub(prompt.width() + ESC_HINT.len()).max(1);
    lines.push(format!("{}{}{}", prompt, " ".repeat(gap), ESC_HINT));
    lines.push(format!("[{}]", palette.active_context()));
    lines.push("─".repeat(width));

    let filtered = palette.filtered();
    let total = filtered.len();
    let start = palette.offset();
    let end = (start + palette.max_visible()).min(total);

    if start > 0 {
        lines.push(format!("  ↑ {} more above", start));
    }

    let mut current_layer = None;
    for (i, entry) in filtered.iter().enumerate().take(end).skip(start) {
        if current_layer != Some(entry.layer) {
            current_layer = Some(entry.layer);
            lines.push(layer_header(palette, entry.layer));
        }
        lines.push(render_entry(entry, i == palette.cursor(), width - 4, styled));
    }

    if end < total {
        lines.push(format!("  ↓ {} more below", total - end));
    }

    if total == 0 {
        lines.push(String::new());
        lines.push("No matching commands".to_string());
    }

    lines.join("\n")
}

fn layer_header(palette: &Palette, layer: Layer) -> String {
    match layer {
        Layer::CurrentMode => palette.active_context().to_uppercase(),
        Layer::Plugin => palette.plugin_context().to_uppercase(),
        Layer::Global => "GLOBAL".to_string(),
    }
}

fn render_entry(entry: &PaletteEntry, selected: bool, max_width: usize, styled: bool) -> String {
    let marker = if selected { '›' } else { ' ' };

    let key = pad(&entry.key_label(), KEY_WIDTH);
    let name = if styled {
        highlight(&entry.name, &entry.match_ranges)
    } else {
        entry.name.clone()
    };
    let name_pad = " ".repeat(NAME_WIDTH.saturating_sub(entry.name.width()));

    let mut desc = entry.description.clone();
    if entry.context_count > 1 {
        desc = format!("{} ({} contexts)", desc, entry.context_count);
    }
    let desc_width = max_width.saturating_sub(KEY_WIDTH + NAME_WIDTH + 4);
    if desc.width() > desc_width && desc_width > 3 {
        desc = format!("{}...", truncate(&desc, desc_width - 3));
    }

    let line = format!("{} {} {}{} {}", marker, key, name, name_pad, desc);
    line.trim_end().to_string()
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// Wrap matched byte ranges of `text` in bold.
fn highlight(text: &str, ranges: &[MatchRange]) -> String {
    let mut out = String::new();
    let mut last = 0;
    for range in ranges {
        if range.end > text.len() || range.start < last {
            continue;
        }
        out.push_str(&text[last..range.start]);
        out.push_str(&text[range.start..range.end].bold().to_string());
        last = range.end;
    }
    out.push_str(&text[last..]);
    out
}
