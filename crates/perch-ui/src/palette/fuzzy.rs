//! Fuzzy filtering of palette entries.
//!
//! A query matches a name when its characters appear in the name in order,
//! ignoring case. Subsequence matching keeps filtering monotonic: a longer
//! query never matches more names than its prefix.

use std::cmp::Reverse;

use super::entries::PaletteEntry;

const MATCH: i32 = 1;
const CONSECUTIVE_BONUS: i32 = 5;
const WORD_START_BONUS: i32 = 10;
const MAX_GAP_PENALTY: i32 = 3;

/// Half-open byte range of matched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRange {
    pub start: usize,
    pub end: usize,
}

/// Match `query` against `text`, returning a score and merged ranges.
pub fn fuzzy_match(query: &str, text: &str) -> Option<(i32, Vec<MatchRange>)> {
    let needle: Vec<char> = query.chars().collect();
    if needle.is_empty() {
        return Some((0, Vec::new()));
    }

    let mut qi = 0;
    let mut score = 0;
    let mut ranges: Vec<MatchRange> = Vec::new();
    let mut prev_char: Option<char> = None;
    let mut last_match: Option<usize> = None;

    for (char_pos, (byte_pos, c)) in text.char_indices().enumerate() {
        if qi < needle.len() && chars_eq(c, needle[qi]) {
            score += MATCH;
            match last_match {
                Some(last) if last + 1 == char_pos => score += CONSECUTIVE_BONUS,
                Some(last) => score -= ((char_pos - last - 1) as i32).min(MAX_GAP_PENALTY),
                None => {}
            }
            if prev_char.map_or(true, |p| matches!(p, ' ' | '-' | '_' | '/')) {
                score += WORD_START_BONUS;
            }

            let end = byte_pos + c.len_utf8();
            match ranges.last_mut() {
                Some(range) if range.end == byte_pos => range.end = end,
                _ => ranges.push(MatchRange {
                    start: byte_pos,
                    end,
                }),
            }

            last_match = Some(char_pos);
            qi += 1;
        }
        prev_char = Some(c);
    }

    (qi == needle.len()).then_some((score, ranges))
}

fn chars_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Filter and order entries for display.
///
/// Entries are grouped by layer. An empty query keeps the build order
/// within each layer; otherwise matches are ordered by descending score,
/// ties keeping their build order.
pub fn filter_entries(entries: &[PaletteEntry], query: &str) -> Vec<PaletteEntry> {
    let mut out: Vec<PaletteEntry> = if query.is_empty() {
        entries
            .iter()
            .cloned()
            .map(|mut e| {
                e.score = 0;
                e.match_ranges.clear();
                e
            })
            .collect()
    } else {
        entries
            .iter()
            .filter_map(|e| {
                let (score, ranges) = fuzzy_match(query, &e.name)?;
                let mut e = e.clone();
                e.score = score;
                e.match_ranges = ranges;
                Some(e)
            })
            .collect()
    };

    out.sort_by_key(|e| (e.layer, Reverse(e.score)));
    out
}
