//! End-to-end tests for the sampling pipeline
//!
//! These tests drive the profiler with scripted process list snapshots to
//! verify:
//! - Report cadence and merged counts
//! - Windowed retention
//! - Handling of transient and fatal snapshot errors
//! - Raw dump output and sink failures
//! - Recovery once snapshots succeed again after an outage
//! - Cancellation of the interval sleep and of a stalled snapshot
//!
//! No database is needed; every round runs with a zero interval.

use async_trait::async_trait;
use myprofiler::config::SamplingConfig;
use myprofiler::pipeline::Profiler;
use myprofiler::source::{ProcessSource, SourceError, SourceResult};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Replays a fixed list of snapshots, then reports idle servers.
struct ScriptedSource {
    snapshots: VecDeque<SourceResult<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl ScriptedSource {
    fn new(snapshots: Vec<SourceResult<Vec<String>>>) -> Self {
        Self {
            snapshots: snapshots.into(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn rounds(rounds: &[&[&str]]) -> Self {
        Self::new(
            rounds
                .iter()
                .map(|round| Ok(round.iter().map(|q| q.to_string()).collect()))
                .collect(),
        )
    }
}

#[async_trait]
impl ProcessSource for ScriptedSource {
    async fn snapshot(&mut self) -> SourceResult<Vec<String>> {
        self.snapshots.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn close(&mut self) -> SourceResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Never answers, like a server stuck on a processlist lock.
struct StalledSource {
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl ProcessSource for StalledSource {
    async fn snapshot(&mut self) -> SourceResult<Vec<String>> {
        std::future::pending().await
    }

    async fn close(&mut self) -> SourceResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory sink that stays readable after being handed to the profiler.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("utf-8 output")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink whose writes always fail.
struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }
}

fn config(delay: u32, last: usize, rounds: u64) -> SamplingConfig {
    SamplingConfig {
        interval: Duration::ZERO,
        delay,
        top: 10,
        last,
        rounds: Some(rounds),
    }
}

/// Split report output into reports, each a list of body lines.
fn reports(output: &str) -> Vec<Vec<String>> {
    let mut reports: Vec<Vec<String>> = Vec::new();
    for line in output.lines() {
        if line.starts_with("## ") {
            reports.push(Vec::new());
        } else {
            reports
                .last_mut()
                .expect("report line before header")
                .push(line.to_string());
        }
    }
    reports
}

fn transient_error() -> SourceError {
    SourceError::Query(mysql_async::Error::from(
        mysql_async::DriverError::ConnectionClosed,
    ))
}

#[tokio::test]
async fn test_single_report_after_cadence_with_merged_counts() {
    let source = ScriptedSource::rounds(&[
        &[
            "SELECT * FROM t WHERE id = 1",
            "SELECT * FROM t WHERE id = 2",
            "SELECT name FROM u WHERE name = 'bob'",
        ],
        &["SELECT * FROM t WHERE id = 3"],
        &["DELETE FROM t WHERE id = 9"],
    ]);
    let out = SharedBuf::default();
    let mut profiler = Profiler::new(source, config(2, 0, 3)).with_output(out.clone());

    let stats = profiler.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(stats.rounds, 3);
    assert_eq!(stats.reports, 1);
    assert_eq!(stats.statements, 5);

    let reports = reports(&out.text());
    assert_eq!(reports.len(), 1, "exactly one report expected");
    assert_eq!(
        reports[0],
        vec![
            "   3 SELECT * FROM t WHERE id = N",
            "   1 SELECT name FROM u WHERE name = S",
        ]
    );

    // Round 3 was still summarized, just not reported yet.
    let totals = profiler.summarizer().totals();
    assert_eq!(totals["DELETE FROM t WHERE id = N"], 1);
}

#[tokio::test]
async fn test_report_every_round_by_default() {
    let source = ScriptedSource::rounds(&[&["SELECT 1"], &["SELECT 2"]]);
    let out = SharedBuf::default();
    let mut profiler = Profiler::new(source, config(1, 0, 2)).with_output(out.clone());

    profiler.run(&CancellationToken::new()).await.unwrap();

    let reports = reports(&out.text());
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0], vec!["   1 SELECT N"]);
    assert_eq!(reports[1], vec!["   2 SELECT N"]);
}

#[tokio::test]
async fn test_windowed_reports_recent_rounds_only() {
    let source = ScriptedSource::rounds(&[
        &["SELECT a FROM t", "SELECT a FROM t"],
        &["SELECT b FROM t"],
        &["SELECT c FROM t"],
    ]);
    let out = SharedBuf::default();
    let mut profiler = Profiler::new(source, config(1, 2, 3)).with_output(out.clone());

    profiler.run(&CancellationToken::new()).await.unwrap();

    let reports = reports(&out.text());
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0], vec!["   2 SELECT a FROM t"]);
    assert_eq!(reports[2], vec!["   1 SELECT b FROM t", "   1 SELECT c FROM t"]);
    assert_eq!(profiler.summarizer().name(), "windowed");
}

#[tokio::test]
async fn test_top_limits_report() {
    let source = ScriptedSource::rounds(&[&[
        "SELECT 1",
        "SELECT 'x'",
        "SELECT 'y'",
        "UPDATE t SET a = 1",
    ]]);
    let out = SharedBuf::default();
    let mut cfg = config(1, 0, 1);
    cfg.top = 1;
    let mut profiler = Profiler::new(source, cfg).with_output(out.clone());

    profiler.run(&CancellationToken::new()).await.unwrap();

    let reports = reports(&out.text());
    assert_eq!(reports[0], vec!["   2 SELECT S"]);
}

#[tokio::test]
async fn test_transient_error_counts_empty_round() {
    let source = ScriptedSource::new(vec![
        Ok(vec!["SELECT 1".to_string()]),
        Err(transient_error()),
        Ok(vec!["SELECT 2".to_string()]),
    ]);
    let out = SharedBuf::default();
    let mut profiler = Profiler::new(source, config(3, 0, 3)).with_output(out.clone());

    let stats = profiler.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(stats.rounds, 3);
    assert_eq!(stats.failed_snapshots, 1);
    assert_eq!(reports(&out.text()), vec![vec!["   2 SELECT N".to_string()]]);
}

#[tokio::test]
async fn test_reports_recover_after_outage() {
    let source = ScriptedSource::new(vec![
        Ok(vec!["SELECT 1".to_string()]),
        Err(transient_error()),
        Err(transient_error()),
        Ok(vec!["SELECT 2".to_string()]),
        Ok(vec!["SELECT 3".to_string(), "SELECT 4".to_string()]),
    ]);
    let out = SharedBuf::default();
    let mut profiler = Profiler::new(source, config(1, 0, 5)).with_output(out.clone());

    let stats = profiler.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(stats.rounds, 5);
    assert_eq!(stats.reports, 5);
    assert_eq!(stats.failed_snapshots, 2);
    let reports = reports(&out.text());
    assert_eq!(reports[1], vec!["   1 SELECT N"], "outage adds nothing");
    assert_eq!(reports[2], vec!["   1 SELECT N"]);
    assert_eq!(reports[3], vec!["   2 SELECT N"]);
    assert_eq!(reports[4], vec!["   4 SELECT N"]);
}

#[tokio::test]
async fn test_unexpected_columns_is_fatal() {
    let source = ScriptedSource::new(vec![
        Ok(vec!["SELECT 1".to_string()]),
        Err(SourceError::UnexpectedColumns(vec!["Id".into(), "User".into()])),
        Ok(vec!["SELECT 2".to_string()]),
    ]);
    let closed = source.closed.clone();
    let out = SharedBuf::default();
    let mut profiler = Profiler::new(source, config(1, 0, 10)).with_output(out.clone());

    let err = profiler.run(&CancellationToken::new()).await.unwrap_err();

    assert!(format!("{err:#}").contains("unknown process list columns"));
    assert_eq!(reports(&out.text()).len(), 1);
    assert!(closed.load(Ordering::SeqCst), "source closed on fatal exit");
}

#[tokio::test]
async fn test_dump_writes_raw_statements() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.log");
    let dump = io::BufWriter::new(std::fs::File::create(&path).unwrap());

    let source = ScriptedSource::rounds(&[
        &["SELECT * FROM t WHERE id = 1", "SELECT   'x'"],
        &["UPDATE t SET a = 0x1F"],
    ]);
    let mut profiler = Profiler::new(source, config(1, 0, 2))
        .with_output(SharedBuf::default())
        .with_dump(dump);

    profiler.run(&CancellationToken::new()).await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        raw,
        "SELECT * FROM t WHERE id = 1\nSELECT   'x'\nUPDATE t SET a = 0x1F\n"
    );
}

#[tokio::test]
async fn test_dump_write_failure_stops_loop() {
    let source = ScriptedSource::rounds(&[&["SELECT 1"], &["SELECT 2"]]);
    let out = SharedBuf::default();
    let mut profiler = Profiler::new(source, config(1, 0, 2))
        .with_output(out.clone())
        .with_dump(BrokenSink);

    let err = profiler.run(&CancellationToken::new()).await.unwrap_err();

    assert!(format!("{err:#}").contains("raw query dump"));
    assert!(out.text().is_empty(), "no report after a failed dump");
    assert!(profiler.summarizer().totals().is_empty());
}

#[tokio::test]
async fn test_report_write_failure_is_fatal() {
    let source = ScriptedSource::rounds(&[&["SELECT 1"]]);
    let mut profiler = Profiler::new(source, config(1, 0, 5)).with_output(BrokenSink);

    let err = profiler.run(&CancellationToken::new()).await.unwrap_err();

    assert!(format!("{err:#}").contains("failed to write report"));
}

#[tokio::test]
async fn test_cancelled_before_start_samples_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let source = ScriptedSource::rounds(&[&["SELECT 1"]]);
    let closed = source.closed.clone();
    let out = SharedBuf::default();
    let mut profiler = Profiler::new(source, config(1, 0, 5)).with_output(out.clone());

    let stats = profiler.run(&cancel).await.unwrap();

    assert_eq!(stats.rounds, 0);
    assert!(out.text().is_empty());
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_cancel_interrupts_sleep() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let source = ScriptedSource::rounds(&[&["SELECT 1"]]);
    let cfg = SamplingConfig {
        interval: Duration::from_secs(3600),
        rounds: None,
        ..SamplingConfig::default()
    };
    let out = SharedBuf::default();
    let mut profiler = Profiler::new(source, cfg).with_output(out.clone());

    let stats = tokio::time::timeout(Duration::from_secs(10), profiler.run(&cancel))
        .await
        .expect("cancellation should end the sleep")
        .unwrap();

    assert_eq!(stats.rounds, 1);
    assert_eq!(reports(&out.text()), vec![vec!["   1 SELECT N".to_string()]]);
}

#[tokio::test]
async fn test_cancel_abandons_stalled_snapshot() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let closed = Arc::new(AtomicBool::new(false));
    let source = StalledSource {
        closed: closed.clone(),
    };
    let out = SharedBuf::default();
    let mut profiler = Profiler::new(source, config(1, 0, 5)).with_output(out.clone());

    let stats = tokio::time::timeout(Duration::from_secs(10), profiler.run(&cancel))
        .await
        .expect("cancellation should end a stalled snapshot")
        .unwrap();

    assert_eq!(stats.rounds, 0);
    assert!(out.text().is_empty());
    assert!(closed.load(Ordering::SeqCst));
}
