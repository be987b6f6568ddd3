//! Core data models for myprofiler
//!
//! These models carry normalized statements between the sampling loop,
//! the summarizers and the reporters.

use std::fmt;

/// A normalized statement paired with how often it was seen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryCount {
    pub query: String,
    pub count: u64,
}

impl QueryCount {
    pub fn new(query: impl Into<String>, count: u64) -> Self {
        Self {
            query: query.into(),
            count,
        }
    }
}

impl fmt::Display for QueryCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4} {}", self.count, self.query)
    }
}

/// One sampling pass, stored compactly.
///
/// Statements are sorted by text and run-length encoded, so each distinct
/// statement appears exactly once with its occurrence count for the pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Round {
    counts: Vec<QueryCount>,
}

impl Round {
    /// Build a round from the normalized statements of one pass.
    pub fn from_batch(mut queries: Vec<String>) -> Self {
        queries.sort_unstable();

        let mut counts: Vec<QueryCount> = Vec::with_capacity(16);
        for query in queries {
            match counts.last_mut() {
                Some(last) if last.query == query => last.count += 1,
                _ => counts.push(QueryCount { query, count: 1 }),
            }
        }

        Self { counts }
    }

    /// Distinct statements of this round, in text order.
    pub fn counts(&self) -> &[QueryCount] {
        &self.counts
    }

    /// Total statements observed, duplicates included.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|qc| qc.count).sum()
    }
}
