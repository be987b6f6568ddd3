//! Ranking and report output
//!
//! A report is a header line with the local time followed by the most
//! frequent normalized statements, highest count first:
//!
//! ```text
//! ## 2024-05-01 12:00:00.25 +0900
//!   42 SELECT * FROM users WHERE id = N
//!    7 UPDATE sessions SET seen = N WHERE token = S
//! ```

mod text;

pub use text::{report_header, write_report};

use crate::models::QueryCount;
use std::collections::HashMap;

/// Rank statements by count, highest first, keeping at most `top_n`.
///
/// Ties are ordered by statement text so the same counts always produce
/// the same report.
pub fn rank(counts: &HashMap<String, u64>, top_n: usize) -> Vec<QueryCount> {
    if top_n == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<QueryCount> = counts
        .iter()
        .map(|(query, &count)| QueryCount::new(query.as_str(), count))
        .collect();
    ranked.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
    ranked.truncate(top_n);
    ranked
}
