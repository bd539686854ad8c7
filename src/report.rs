//! Rendering of an `AggregateReport` as an indented JSON document.

use crate::error::StatError;
use crate::stats::AggregateReport;
use chrono::Duration;
use serde::Serialize;
use std::collections::BTreeMap;

/// The serialized shape of the report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub count: usize,
    pub average_create_to_terminal: String,
    pub average_open_to_terminal: String,
    /// Sorted by author so output is stable between runs.
    pub count_per_author: BTreeMap<String, usize>,
}

impl From<&AggregateReport> for ReportDocument {
    fn from(report: &AggregateReport) -> Self {
        Self {
            count: report.count,
            average_create_to_terminal: format_duration(report.average_create_to_terminal),
            average_open_to_terminal: format_duration(report.average_open_to_terminal),
            count_per_author: report
                .count_per_author
                .iter()
                .map(|(author, count)| (author.clone(), *count))
                .collect(),
        }
    }
}

/// Pretty-prints the report with two-space indentation.
pub fn format(report: &AggregateReport) -> Result<String, StatError> {
    Ok(serde_json::to_string_pretty(&ReportDocument::from(report))?)
}

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Formats a duration the way Go's `time.Duration` prints, e.g. `72h3m1s`, `1.5s`, `250ms`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = match duration.num_nanoseconds() {
        Some(nanos) => nanos,
        None if duration < Duration::zero() => i64::MIN,
        None => i64::MAX,
    };
    if nanos == 0 {
        return "0s".to_string();
    }

    let sign = if nanos < 0 { "-" } else { "" };
    let abs = nanos.unsigned_abs();

    let body = if abs < NANOS_PER_MICRO {
        format!("{abs}ns")
    } else if abs < NANOS_PER_MILLI {
        format!("{}µs", decimal(abs / NANOS_PER_MICRO, abs % NANOS_PER_MICRO, 3))
    } else if abs < NANOS_PER_SEC {
        format!("{}ms", decimal(abs / NANOS_PER_MILLI, abs % NANOS_PER_MILLI, 6))
    } else {
        let total_secs = abs / NANOS_PER_SEC;
        let hours = total_secs / 3600;
        let minutes = (total_secs / 60) % 60;
        let seconds = decimal(total_secs % 60, abs % NANOS_PER_SEC, 9);

        let mut out = String::new();
        if hours > 0 {
            out.push_str(&format!("{hours}h"));
        }
        if hours > 0 || minutes > 0 {
            out.push_str(&format!("{minutes}m"));
        }
        out.push_str(&format!("{seconds}s"));
        out
    };

    format!("{sign}{body}")
}

/// `whole.fraction` with `digits` fractional places, trailing zeros dropped.
fn decimal(whole: u64, fraction: u64, digits: usize) -> String {
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{fraction:0digits$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}
