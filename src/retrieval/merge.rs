//! Deduplication and the single comparable ordering.
//!
//! Vector distance and BM25 score live in incomparable numeric spaces, so
//! instead of corpus-dependent score fusion the merge applies a strict
//! precedence policy: a vector occurrence always supersedes a keyword
//! occurrence of the same chunk, and keyword-only hits rank after every
//! vector hit. The composite sort key is total, so output order never
//! depends on map iteration order.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::model::{OriginKind, SearchResult};

/// Composite ranking: distance ascending with absent treated as infinite,
/// then origin (vector before keyword), then id.
pub fn compare_ranked(a: &SearchResult, b: &SearchResult) -> Ordering {
    a.ranking_distance()
        .partial_cmp(&b.ranking_distance())
        .unwrap_or(Ordering::Equal)
        .then(a.origin.cmp(&b.origin))
        .then_with(|| a.id.cmp(&b.id))
}

/// Merge normalized results from all backends into an ordered,
/// duplicate-free sequence of at most `k` entries.
///
/// For colliding ids, a vector occurrence supersedes a keyword one; within
/// the same origin the first occurrence (backend enumeration order) wins.
pub fn merge_ranked(results: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
    let mut best: HashMap<String, SearchResult> = HashMap::with_capacity(results.len());

    for result in results {
        match best.entry(result.id.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(result);
            }
            Entry::Occupied(mut entry) => {
                if result.origin == OriginKind::Vector
                    && entry.get().origin == OriginKind::Keyword
                {
                    entry.insert(result);
                }
            }
        }
    }

    let mut merged: Vec<SearchResult> = best.into_values().collect();
    merged.sort_by(compare_ranked);
    merged.truncate(k);
    merged
}
