//! Palette entries and their layering.

use perch_core::{Category, Command, GLOBAL_CONTEXT};
use perch_plugin_api::KeymapRegistry;
use rustc_hash::{FxHashMap, FxHashSet};

use super::fuzzy::MatchRange;

/// Relevance layer of an entry relative to the focused pane.
///
/// Ordering is render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Bindings of the active mode, e.g. "git-diff".
    CurrentMode,
    /// Bindings of the focused plugin or another plugin.
    Plugin,
    /// Bindings available everywhere.
    Global,
}

/// One searchable (command, context) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteEntry {
    /// Every chord bound to this pair, in registration order.
    pub keys: Vec<String>,
    pub command_id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub context: String,
    pub layer: Layer,
    /// Fuzzy score, zero for an empty query.
    pub score: i32,
    /// Byte ranges of `name` matched by the query.
    pub match_ranges: Vec<MatchRange>,
    /// Distinct contexts the command ID is bound in.
    pub context_count: usize,
}

impl PaletteEntry {
    /// Keys for display, e.g. "j/down".
    pub fn key_label(&self) -> String {
        self.keys.join("/")
    }
}

/// Classify a binding context relative to the focused pane.
pub fn determine_layer(binding_context: &str, active_context: &str, plugin_context: &str) -> Layer {
    if binding_context == active_context {
        return Layer::CurrentMode;
    }
    let is_parent_mode = active_context
        .strip_prefix(binding_context)
        .is_some_and(|rest| rest.starts_with('-'));
    if binding_context == plugin_context || is_parent_mode {
        return Layer::Plugin;
    }
    if binding_context == GLOBAL_CONTEXT {
        return Layer::Global;
    }
    Layer::Plugin
}

/// Build one entry per unique (command, context) across every bound context.
///
/// Names, descriptions and categories come from `commands` when a plugin
/// exports the command ID, otherwise they are derived from the ID.
pub fn build_entries(
    keymap: &KeymapRegistry,
    commands: &[Command],
    active_context: &str,
    plugin_context: &str,
) -> Vec<PaletteEntry> {
    let metadata: FxHashMap<&str, &Command> =
        commands.iter().map(|cmd| (cmd.id.as_str(), cmd)).collect();

    let per_context: Vec<_> = keymap
        .all_contexts()
        .into_iter()
        .map(|ctx| {
            let bindings = keymap.bindings_for_context(&ctx);
            (ctx, bindings)
        })
        .collect();

    let mut context_counts: FxHashMap<&str, usize> = FxHashMap::default();
    for (_, bindings) in &per_context {
        let distinct: FxHashSet<&str> = bindings.iter().map(|b| b.command.as_str()).collect();
        for command in distinct {
            *context_counts.entry(command).or_default() += 1;
        }
    }

    let mut entries: Vec<PaletteEntry> = Vec::new();
    let mut index: FxHashMap<(&str, &str), usize> = FxHashMap::default();

    for (ctx, bindings) in &per_context {
        for binding in bindings {
            let pair = (binding.command.as_str(), ctx.as_str());
            if let Some(&i) = index.get(&pair) {
                entries[i].keys.push(binding.key.clone());
                continue;
            }
            index.insert(pair, entries.len());

            let meta = metadata.get(binding.command.as_str());
            let name = meta
                .map(|c| c.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format_command_id(&binding.command));
            let description = meta
                .map(|c| c.description.clone())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| format_command_id(&binding.command));
            let category = meta
                .map(|c| c.category)
                .unwrap_or_else(|| infer_category(&binding.command));

            entries.push(PaletteEntry {
                keys: vec![binding.key.clone()],
                command_id: binding.command.clone(),
                name,
                description,
                category,
                context: ctx.clone(),
                layer: determine_layer(ctx, active_context, plugin_context),
                score: 0,
                match_ranges: Vec::new(),
                context_count: context_counts
                    .get(binding.command.as_str())
                    .copied()
                    .unwrap_or(1),
            });
        }
    }

    entries
}

/// "stage-file" -> "Stage file".
pub fn format_command_id(id: &str) -> String {
    let mut words = id.split('-');
    let Some(first) = words.next() else {
        return id.to_string();
    };
    let mut chars = first.chars();
    let mut out: String = match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    for word in words {
        out.push(' ');
        out.push_str(word);
    }
    out
}

const CATEGORY_RULES: &[(Category, &[&str])] = &[
    (
        Category::Navigation,
        &["scroll", "cursor", "next", "prev", "top", "bottom", "focus"],
    ),
    (Category::Search, &["search", "find"]),
    (Category::View, &["view", "show", "toggle", "diff"]),
    (
        Category::Git,
        &["stage", "unstage", "commit", "push", "pull", "history"],
    ),
    (Category::Edit, &["edit", "delete", "add", "remove"]),
    (Category::System, &["quit", "refresh", "help"]),
];

/// Guess a category from keywords in the command ID.
pub fn infer_category(command_id: &str) -> Category {
    let lower = command_id.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}
