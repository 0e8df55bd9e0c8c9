//! Fixed-length substring index over raw text.
//!
//! Works on characters, not tokens, so it can propose matches for partial
//! words that the term vocabulary cannot answer. Offsets are character
//! offsets into the lowercased text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KGramIndex {
    k: usize,
    grams: HashMap<String, Vec<usize>>,
}

impl KGramIndex {
    /// # Panics
    /// If `k` is zero.
    pub fn new(k: usize) -> Self {
        assert!(k >= 1, "k-gram length must be at least 1");
        Self { k, grams: HashMap::new() }
    }

    pub fn k(&self) -> usize { self.k }

    pub fn len(&self) -> usize { self.grams.len() }

    pub fn is_empty(&self) -> bool { self.grams.is_empty() }

    /// Add every k-length window of `text`. Offsets from repeated calls
    /// accumulate in the same lists.
    pub fn build_index(&mut self, text: &str) {
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        for (offset, window) in chars.windows(self.k).enumerate() {
            let gram: String = window.iter().collect();
            self.grams.entry(gram).or_default().push(offset);
        }
    }

    /// Candidate alignment offsets for `query`: for the window at query
    /// offset `i`, every indexed offset `o` of that gram contributes `o - i`.
    ///
    /// Unordered, with duplicates. An alignment can be negative when a later
    /// query window matches near the start of the text. See
    /// [`KGramIndex::find`] for verified matches.
    pub fn search(&self, query: &str) -> Vec<isize> {
        let chars: Vec<char> = query.to_lowercase().chars().collect();
        let mut candidates = Vec::new();
        for (i, window) in chars.windows(self.k).enumerate() {
            let gram: String = window.iter().collect();
            if let Some(offsets) = self.grams.get(&gram) {
                candidates.extend(offsets.iter().map(|&o| o as isize - i as isize));
            }
        }
        candidates
    }

    /// Alignments supported by every window of `query`, sorted and deduplicated.
    ///
    /// A query shorter than `k` has no windows and never matches.
    pub fn find(&self, query: &str) -> Vec<usize> {
        let windows = query.to_lowercase().chars().count().saturating_sub(self.k - 1);
        if windows == 0 {
            return Vec::new();
        }
        let mut counts: HashMap<isize, usize> = HashMap::new();
        for offset in self.search(query) {
            *counts.entry(offset).or_insert(0) += 1;
        }
        let mut found: Vec<usize> = counts
            .into_iter()
            .filter(|&(_, n)| n >= windows)
            .filter_map(|(offset, _)| usize::try_from(offset).ok())
            .collect();
        found.sort_unstable();
        found
    }
}
