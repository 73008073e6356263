//! Access log metric source
//!
//! Tails the servlet container's access log and aggregates request
//! statistics over a bounded window of recent entries. The expected line
//! format is the combined pattern with a trailing response time:
//!
//! ```text
//! %h %l %u [%t] "%r" %s %b %D "%{User-Agent}i"
//! ```
//!
//! Lines that do not match are skipped, never fatal; a log rotation simply
//! shrinks the window until new entries arrive.

use super::MetricSource;
use crate::models::{MetricSnapshot, PathCount, RequestStats};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// Entries retained for statistics
const RECENT_CAPACITY: usize = 10_000;

/// Slow entries retained separately for inspection
const SLOW_CAPACITY: usize = 1_000;

/// Lines read from the end of the log each cycle
const TAIL_LINES: usize = 100;

/// How many of the most requested paths to report
const TOP_PATHS: usize = 10;

/// One parsed access log line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessLogEntry {
    pub host: String,
    pub timestamp: f64,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub bytes: u64,
    pub response_time_ms: u64,
}

#[derive(Default)]
struct LogState {
    recent: VecDeque<AccessLogEntry>,
    slow: VecDeque<AccessLogEntry>,
}

/// Metric source that aggregates request statistics from the access log
pub struct AccessLogSource {
    log_path: PathBuf,
    slow_threshold_ms: u64,
    state: Mutex<LogState>,
}

impl AccessLogSource {
    pub fn new(log_path: impl Into<PathBuf>, slow_threshold_ms: u64) -> Self {
        Self {
            log_path: log_path.into(),
            slow_threshold_ms,
            state: Mutex::new(LogState::default()),
        }
    }

    /// The most recent slow entries, newest first, capped at `limit`.
    pub fn slow_requests(&self, limit: usize) -> Vec<AccessLogEntry> {
        let state = self.state.lock().unwrap();
        state.slow.iter().rev().take(limit).cloned().collect()
    }

    fn ingest(&self, entries: Vec<AccessLogEntry>) -> RequestStats {
        let mut state = self.state.lock().unwrap();

        for entry in entries {
            if entry.response_time_ms >= self.slow_threshold_ms {
                if state.slow.len() == SLOW_CAPACITY {
                    state.slow.pop_front();
                }
                state.slow.push_back(entry.clone());
            }
            if state.recent.len() == RECENT_CAPACITY {
                state.recent.pop_front();
            }
            state.recent.push_back(entry);
        }

        let mut status_codes: BTreeMap<u16, u64> = BTreeMap::new();
        let mut path_counts: HashMap<&str, u64> = HashMap::new();
        let mut time_sum = 0u64;
        let mut timed_entries = 0u64;
        let mut max_time = 0u64;

        for entry in &state.recent {
            *status_codes.entry(entry.status).or_insert(0) += 1;
            *path_counts.entry(entry.path.as_str()).or_insert(0) += 1;
            if entry.response_time_ms > 0 {
                time_sum += entry.response_time_ms;
                timed_entries += 1;
                max_time = max_time.max(entry.response_time_ms);
            }
        }

        let mut top_paths: Vec<PathCount> = path_counts
            .into_iter()
            .map(|(path, count)| PathCount {
                path: path.to_string(),
                count,
            })
            .collect();
        top_paths.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
        top_paths.truncate(TOP_PATHS);

        RequestStats {
            total_requests: state.recent.len() as u64,
            slow_requests: state.slow.len() as u64,
            avg_response_time_ms: if timed_entries > 0 {
                time_sum as f64 / timed_entries as f64
            } else {
                0.0
            },
            max_response_time_ms: max_time,
            status_codes,
            top_paths,
        }
    }
}

#[async_trait]
impl MetricSource for AccessLogSource {
    fn name(&self) -> &str {
        "access_log"
    }

    async fn collect(&self, snapshot: &mut MetricSnapshot) -> Result<()> {
        let contents = tokio::fs::read_to_string(&self.log_path)
            .await
            .with_context(|| format!("failed to read access log {}", self.log_path.display()))?;

        let lines: Vec<&str> = contents.lines().collect();
        let start = lines.len().saturating_sub(TAIL_LINES);
        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for line in &lines[start..] {
            match parse_access_log_line(line) {
                Some(entry) => entries.push(entry),
                None if !line.trim().is_empty() => skipped += 1,
                None => {}
            }
        }
        if skipped > 0 {
            debug!(skipped, "Skipped unparseable access log lines");
        }

        snapshot.requests = Some(self.ingest(entries));
        Ok(())
    }
}

/// Parse one combined-format access log line. Returns `None` for lines that
/// do not match the expected shape.
pub fn parse_access_log_line(line: &str) -> Option<AccessLogEntry> {
    let host = line.split_whitespace().next()?.to_string();

    // Timestamp between the first bracket pair
    let time_start = line.find('[')? + 1;
    let time_end = line[time_start..].find(']')? + time_start;
    let timestamp = DateTime::parse_from_str(&line[time_start..time_end], "%d/%b/%Y:%H:%M:%S %z")
        .ok()?
        .timestamp() as f64;

    // Request line between the first quote pair
    let request_start = line[time_end..].find('"')? + time_end + 1;
    let request_end = line[request_start..].find('"')? + request_start;
    let mut request = line[request_start..request_end].split_whitespace();
    let method = request.next()?.to_string();
    let path = request.next()?.to_string();

    // Status, bytes, and response time follow the closing quote
    let mut tail = line[request_end + 1..].split_whitespace();
    let status = tail.next()?.parse::<u16>().ok()?;
    let bytes_field = tail.next()?;
    let bytes = if bytes_field == "-" {
        0
    } else {
        bytes_field.parse::<u64>().ok()?
    };
    let response_time_ms = tail.next()?.parse::<u64>().ok()?;

    Some(AccessLogEntry {
        host,
        timestamp,
        method,
        path,
        status,
        bytes,
        response_time_ms,
    })
}
