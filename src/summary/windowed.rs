//! Sliding window over the most recent rounds

use super::Summarizer;
use crate::models::Round;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Keeps the last `capacity` rounds and reports their combined counts.
///
/// Totals are recomputed from the retained rounds on every call, so a round
/// stops contributing as soon as it is evicted.
#[derive(Debug)]
pub struct WindowedSummarizer {
    capacity: usize,
    rounds: VecDeque<Round>,
}

impl WindowedSummarizer {
    /// Create a window of `capacity` rounds. A capacity of 0 is raised to 1.
    ///
    /// The window grows one round at a time, so a large capacity costs
    /// nothing until that many rounds have been sampled.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rounds: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of rounds currently retained.
    pub fn retained(&self) -> usize {
        self.rounds.len()
    }
}

impl Summarizer for WindowedSummarizer {
    fn name(&self) -> &'static str {
        "windowed"
    }

    fn update(&mut self, queries: Vec<String>) {
        let round = Round::from_batch(queries);
        let observed = round.total();
        self.rounds.push_back(round);
        while self.rounds.len() > self.capacity {
            self.rounds.pop_front();
        }
        debug!(
            "Window: {}/{} rounds, newest has {} statements",
            self.retained(),
            self.capacity(),
            observed
        );
    }

    fn totals(&self) -> HashMap<String, u64> {
        let mut sum: HashMap<String, u64> = HashMap::new();
        for round in &self.rounds {
            for qc in round.counts() {
                *sum.entry(qc.query.clone()).or_insert(0) += qc.count;
            }
        }
        sum
    }
}
