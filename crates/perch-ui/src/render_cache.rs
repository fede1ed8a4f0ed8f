//! Cache of wrapped pane text.
//!
//! Plugins re-render every frame but their text rarely changes, so wrapped
//! output is cached by a hash of (content, width). Readers share the lock;
//! a miss re-checks under the write lock before inserting.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Entries held before the cache is cleared.
pub const CAPACITY: usize = 100;

#[derive(Default)]
pub struct RenderCache {
    entries: RwLock<FxHashMap<u64, Arc<str>>>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `content` hard-wrapped to `width` columns.
    pub fn wrapped(&self, content: &str, width: u16) -> Arc<str> {
        let key = cache_key(content, width);

        if let Some(hit) = self.entries.read().get(&key) {
            return hit.clone();
        }

        let mut entries = self.entries.write();
        if let Some(hit) = entries.get(&key) {
            return hit.clone();
        }

        if entries.len() >= CAPACITY {
            tracing::trace!("Render cache full, clearing {} entries", entries.len());
            entries.clear();
        }

        let rendered: Arc<str> = wrap(content, usize::from(width)).into();
        entries.insert(key, rendered.clone());
        rendered
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn cache_key(content: &str, width: u16) -> u64 {
    let mut hasher = FxHasher::default();
    content.hash(&mut hasher);
    width.hash(&mut hasher);
    hasher.finish()
}

/// Hard-wrap every line of `content` at `width` display columns.
pub fn wrap(content: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    let mut out = String::with_capacity(content.len());
    for (i, line) in content.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut col = 0;
        for grapheme in line.graphemes(true) {
            let w = grapheme.width();
            if col + w > width && col > 0 {
                out.push('\n');
                col = 0;
            }
            out.push_str(grapheme);
            col += w;
        }
    }
    out
}

/// Cut `line` to at most `width` display columns.
pub fn truncate(line: &str, width: usize) -> &str {
    let mut col = 0;
    for (idx, grapheme) in line.grapheme_indices(true) {
        col += grapheme.width();
        if col > width {
            return &line[..idx];
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("abcdef", 4), "abcd\nef");
        assert_eq!(wrap("ab\ncdefg", 3), "ab\ncde\nfg");
        assert_eq!(wrap("日本語", 4), "日本\n語");
        assert_eq!(wrap("abc", 0), "");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("日本語", 5), "日本");
        assert_eq!(truncate("ab", 10), "ab");
    }

    #[test]
    fn test_cache_hits_share_allocation() {
        let cache = RenderCache::new();
        let a = cache.wrapped("hello world", 5);
        let b = cache.wrapped("hello world", 5);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(&*a, "hello\n worl\nd");

        let c = cache.wrapped("hello world", 6);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_clears_at_capacity() {
        let cache = RenderCache::new();
        for i in 0..CAPACITY {
            cache.wrapped(&format!("line {}", i), 80);
        }
        assert_eq!(cache.len(), CAPACITY);

        cache.wrapped("one more", 80);
        assert_eq!(cache.len(), 1);
    }
}
