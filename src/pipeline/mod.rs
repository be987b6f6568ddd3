//! Sampling pipeline
//!
//! Each round:
//! 1. Snapshot the statements currently in flight
//! 2. Append them verbatim to the raw dump, if one is configured
//! 3. Normalize them
//! 4. Feed the round to the summarizer
//! 5. Every `delay` rounds, print a report
//! 6. Sleep for `interval`, or stop early when cancelled
//!
//! A failed snapshot costs one (empty) round. A failed write to either sink
//! stops the loop. Cancellation also abandons a snapshot that is still
//! waiting on the server.

use anyhow::{Context, Result};
use chrono::Local;
use std::io::{self, Write};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SamplingConfig;
use crate::normalize::normalize_all;
use crate::reporters::report_header;
use crate::source::ProcessSource;
use crate::summary::{new_summarizer, Summarizer};

/// Upper bound on closing the source after the loop ends
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Counters for one profiling session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileStats {
    /// Rounds sampled
    pub rounds: u64,
    /// Reports written
    pub reports: u64,
    /// Statements seen, before normalization
    pub statements: u64,
    /// Rounds lost to transient snapshot errors
    pub failed_snapshots: u64,
}

/// Drives a [`ProcessSource`] through normalization and summarization.
pub struct Profiler<S> {
    source: S,
    summarizer: Box<dyn Summarizer>,
    config: SamplingConfig,
    dump: Option<Box<dyn Write>>,
    out: Box<dyn Write>,
}

impl<S: ProcessSource> Profiler<S> {
    /// Create a profiler that reports to stdout.
    ///
    /// The summary strategy follows `config.last`.
    pub fn new(source: S, config: SamplingConfig) -> Self {
        Self {
            source,
            summarizer: new_summarizer(config.last),
            config,
            dump: None,
            out: Box::new(io::stdout()),
        }
    }

    /// Write every raw statement to `dump` before normalization.
    pub fn with_dump(mut self, dump: impl Write + 'static) -> Self {
        self.dump = Some(Box::new(dump));
        self
    }

    /// Send reports to `out` instead of stdout.
    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn summarizer(&self) -> &dyn Summarizer {
        self.summarizer.as_ref()
    }

    /// Sample until cancelled, until `config.rounds` is reached, or until a
    /// fatal error.
    ///
    /// Sinks are flushed and the source is closed on every exit path.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<ProfileStats> {
        info!(
            "Sampling every {:?}, report every {} round(s), top {}, {} summary",
            self.config.interval,
            self.config.delay,
            self.config.top,
            self.summarizer.name()
        );

        let mut stats = ProfileStats::default();
        let outcome = self.sample(cancel, &mut stats).await;

        let flushed = self.flush();
        match tokio::time::timeout(CLOSE_TIMEOUT, self.source.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to close process list source: {}", e),
            Err(_) => warn!("Gave up closing process list source after {:?}", CLOSE_TIMEOUT),
        }

        outcome?;
        flushed.context("failed to flush output")?;

        info!(
            "Stopped after {} rounds ({} reports, {} statements)",
            stats.rounds, stats.reports, stats.statements
        );
        Ok(stats)
    }

    async fn sample(
        &mut self,
        cancel: &CancellationToken,
        stats: &mut ProfileStats,
    ) -> Result<()> {
        let mut pending: u32 = 0;

        while !cancel.is_cancelled() {
            let snapshot = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Cancelled during snapshot, dropping round {}", stats.rounds + 1);
                    break;
                }
                snapshot = self.source.snapshot() => snapshot,
            };

            let mut queries = match snapshot {
                Ok(queries) => queries,
                Err(e) if e.is_transient() => {
                    warn!("Snapshot failed, counting an empty round: {}", e);
                    stats.failed_snapshots += 1;
                    Vec::new()
                }
                Err(e) => return Err(e).context("cannot read the process list"),
            };
            stats.statements += queries.len() as u64;

            if let Some(dump) = self.dump.as_mut() {
                write_dump(dump.as_mut(), &queries).context("failed to write raw query dump")?;
            }

            normalize_all(&mut queries);
            debug!("Round {}: {} statements", stats.rounds + 1, queries.len());
            self.summarizer.update(queries);
            stats.rounds += 1;

            pending += 1;
            if pending >= self.config.delay {
                pending = 0;
                self.report().context("failed to write report")?;
                stats.reports += 1;
            }

            if self.config.rounds.is_some_and(|limit| stats.rounds >= limit) {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        Ok(())
    }

    fn report(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", report_header(&Local::now()))?;
        self.summarizer.show(self.out.as_mut(), self.config.top)?;
        self.out.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(dump) = self.dump.as_mut() {
            dump.flush()?;
        }
        self.out.flush()
    }
}

/// Append raw statements, one per line, and push them to the sink.
fn write_dump(dump: &mut dyn Write, queries: &[String]) -> io::Result<()> {
    for query in queries {
        dump.write_all(query.as_bytes())?;
        dump.write_all(b"\n")?;
    }
    dump.flush()
}
