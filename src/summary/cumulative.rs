//! Lifetime totals

use super::Summarizer;
use std::collections::HashMap;
use tracing::debug;

/// Counts every statement seen since startup. Entries never shrink.
#[derive(Debug, Default)]
pub struct CumulativeSummarizer {
    counts: HashMap<String, u64>,
}

impl CumulativeSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct statements recorded so far.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }
}

impl Summarizer for CumulativeSummarizer {
    fn name(&self) -> &'static str {
        "cumulative"
    }

    fn update(&mut self, queries: Vec<String>) {
        for query in queries {
            *self.counts.entry(query).or_insert(0) += 1;
        }
        debug!("Tracking {} distinct statements", self.distinct());
    }

    fn totals(&self) -> HashMap<String, u64> {
        self.counts.clone()
    }
}
