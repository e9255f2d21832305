// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared aggregation state.
//!
//! The histogram and the per-entry word-count table live in one struct so that a single lock
//! covers both: a worker updates the histogram, records the entry's word count and decides
//! whether to flush without releasing the guard in between.

use fnv::FnvBuildHasher;
use hashbrown::HashMap;
use tracing::debug;

/// Histogram of lower-cased words to occurrence counts.
pub type Histogram = HashMap<String, i64, FnvBuildHasher>;

/// Word count of each entry processed since the last flush, keyed by entry index.
pub type WordCounts = HashMap<i64, i64, FnvBuildHasher>;

#[derive(Debug, Default)]
pub struct Aggregator {
    histogram: Histogram,
    word_counts: WordCounts,
}

impl Aggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one entry's already lower-cased words into the histogram and records its word
    /// count. Returns the number of words.
    pub fn insert(&mut self, index: i64, words: &[String]) -> usize {
        for word in words {
            *self.histogram.entry_ref(word.as_str()).or_insert(0) += 1;
        }
        if self
            .word_counts
            .insert(index, words.len() as i64)
            .is_some()
        {
            debug!("Entry {} was aggregated twice since the last flush", index);
        }
        words.len()
    }

    #[cfg(test)]
    pub fn word_count(&self, index: i64) -> Option<i64> {
        self.word_counts.get(&index).copied()
    }

    #[cfg(test)]
    pub fn occurrences(&self, word: &str) -> Option<i64> {
        self.histogram.get(word).copied()
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn has_word_counts(&self) -> bool {
        !self.word_counts.is_empty()
    }

    pub fn pending_word_counts(&self) -> usize {
        self.word_counts.len()
    }

    /// Drains the per-entry table, leaving it empty.
    pub fn consume_word_counts(&mut self) -> Vec<(i64, i64)> {
        std::mem::take(&mut self.word_counts).into_iter().collect()
    }

    /// Drains the histogram. Only called once, after every worker has stopped.
    pub fn consume_histogram(&mut self) -> Vec<(String, i64)> {
        std::mem::take(&mut self.histogram).into_iter().collect()
    }
}
