//! Plain text report lines

use crate::models::QueryCount;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::io::{self, Write};

/// Header line that opens each report.
///
/// Time is printed with centisecond precision and the numeric UTC offset,
/// e.g. `## 2024-05-01 12:00:00.25 +0900`.
pub fn report_header<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!(
        "## {}.{:02} {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        now.timestamp_subsec_millis().min(999) / 10,
        now.format("%z")
    )
}

/// Write ranked statements, one `<count> <statement>` line each.
pub fn write_report(out: &mut dyn Write, ranked: &[QueryCount]) -> io::Result<()> {
    for qc in ranked {
        writeln!(out, "{qc}")?;
    }
    Ok(())
}
