//! Frequency summaries over sampling rounds
//!
//! Two strategies share the [`Summarizer`] interface:
//! - [`CumulativeSummarizer`] keeps lifetime totals for every statement
//! - [`WindowedSummarizer`] keeps only the most recent N rounds
//!
//! The strategy is picked once at startup by [`new_summarizer`].

mod cumulative;
mod windowed;

pub use cumulative::CumulativeSummarizer;
pub use windowed::WindowedSummarizer;

use crate::reporters::{rank, write_report};
use std::collections::HashMap;
use std::io::{self, Write};

/// Accumulates rounds of normalized statements and reports the top ones.
pub trait Summarizer: Send {
    /// Name of this strategy (for logging)
    fn name(&self) -> &'static str;

    /// Record one round of normalized statements.
    fn update(&mut self, queries: Vec<String>);

    /// Current statement totals as seen by this strategy.
    fn totals(&self) -> HashMap<String, u64>;

    /// Write the `top_n` most frequent statements. Does not change state.
    fn show(&self, out: &mut dyn Write, top_n: usize) -> io::Result<()> {
        write_report(out, &rank(&self.totals(), top_n))
    }
}

/// Pick the summary strategy for a retention setting.
///
/// `last > 0` keeps a window of that many rounds; `0` keeps lifetime totals.
pub fn new_summarizer(last: usize) -> Box<dyn Summarizer> {
    if last == 0 {
        return Box::new(CumulativeSummarizer::new());
    }
    Box::new(WindowedSummarizer::new(last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_retention_is_cumulative() {
        assert_eq!(new_summarizer(0).name(), "cumulative");
    }

    #[test]
    fn test_positive_retention_is_windowed() {
        assert_eq!(new_summarizer(3).name(), "windowed");
    }

    #[test]
    fn test_show_is_read_only() {
        let mut summ = new_summarizer(0);
        summ.update(vec!["A".into(), "B".into()]);
        let before = summ.totals();
        let mut out = Vec::new();
        summ.show(&mut out, 10).unwrap();
        summ.show(&mut out, 10).unwrap();
        assert_eq!(summ.totals(), before);
    }
}
