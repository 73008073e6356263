//! Host-level metric source
//!
//! Reads CPU, load average, and memory figures from procfs. The parse
//! functions are pure and take raw file contents, so they are testable on
//! string fixtures; the async collect path only does file reads.

use super::MetricSource;
use crate::models::{epoch_seconds, CpuMetrics, MemoryMetrics, MetricSnapshot, OsMetrics};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

/// Aggregate jiffy counters from one /proc/stat reading
#[derive(Debug, Clone, Copy)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

/// Metric source backed by /proc
pub struct OsSource {
    proc_path: PathBuf,
    /// Previous cycle's jiffy counters, for delta-based CPU usage
    prev_cpu: Mutex<Option<CpuTimes>>,
}

impl OsSource {
    pub fn new() -> Self {
        Self::with_proc_path("/proc")
    }

    pub fn with_proc_path(proc_path: impl Into<PathBuf>) -> Self {
        Self {
            proc_path: proc_path.into(),
            prev_cpu: Mutex::new(None),
        }
    }

    /// CPU busy percentage from the jiffy delta against the previous cycle.
    /// The first cycle has no baseline and reports 0.
    fn cpu_percent_from(&self, current: CpuTimes) -> f64 {
        let mut prev = self.prev_cpu.lock().unwrap();
        let percent = match *prev {
            Some(p) if current.total > p.total => {
                let busy_delta = current.busy.saturating_sub(p.busy) as f64;
                let total_delta = (current.total - p.total) as f64;
                (busy_delta / total_delta * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        };
        *prev = Some(current);
        percent
    }
}

impl Default for OsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricSource for OsSource {
    fn name(&self) -> &str {
        "os"
    }

    async fn collect(&self, snapshot: &mut MetricSnapshot) -> Result<()> {
        let stat = tokio::fs::read_to_string(self.proc_path.join("stat"))
            .await
            .context("failed to read /proc/stat")?;
        let meminfo = tokio::fs::read_to_string(self.proc_path.join("meminfo"))
            .await
            .context("failed to read /proc/meminfo")?;
        let loadavg = tokio::fs::read_to_string(self.proc_path.join("loadavg"))
            .await
            .context("failed to read /proc/loadavg")?;

        let times = parse_cpu_times(&stat)?;
        let (load_1m, load_5m, load_15m) = parse_loadavg(&loadavg)?;
        let memory = parse_meminfo(&meminfo)?;

        snapshot.os = OsMetrics {
            cpu: CpuMetrics {
                cpu_percent: self.cpu_percent_from(times),
                load_average_1m: load_1m,
                load_average_5m: load_5m,
                load_average_15m: load_15m,
                cpu_count: count_cpus(&stat),
            },
            memory,
            timestamp: epoch_seconds(),
        };
        Ok(())
    }
}

/// Parse the aggregate `cpu` line of /proc/stat into busy/total jiffies.
/// Idle and iowait count as idle time, everything else as busy.
pub fn parse_cpu_times(stat: &str) -> Result<CpuTimes> {
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .context("no aggregate cpu line in /proc/stat")?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .context("malformed cpu line in /proc/stat")?;
    if fields.len() < 5 {
        bail!("cpu line in /proc/stat has too few fields");
    }

    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes {
        busy: total - idle,
        total,
    })
}

/// Number of per-cpu lines (cpu0, cpu1, ...) in /proc/stat.
pub fn count_cpus(stat: &str) -> u32 {
    stat.lines()
        .filter(|l| {
            l.starts_with("cpu") && l.as_bytes().get(3).is_some_and(|b| b.is_ascii_digit())
        })
        .count() as u32
}

/// Parse the three load averages from /proc/loadavg.
pub fn parse_loadavg(loadavg: &str) -> Result<(f64, f64, f64)> {
    let mut fields = loadavg.split_whitespace();
    let mut next = || -> Result<f64> {
        fields
            .next()
            .context("missing field in /proc/loadavg")?
            .parse::<f64>()
            .context("malformed field in /proc/loadavg")
    };
    Ok((next()?, next()?, next()?))
}

/// Parse memory figures from /proc/meminfo.
///
/// Uses MemAvailable rather than MemFree so that reclaimable page cache does
/// not count as used memory.
pub fn parse_meminfo(meminfo: &str) -> Result<MemoryMetrics> {
    let mut total_kb = None;
    let mut available_kb = None;
    let mut swap_total_kb = None;
    let mut swap_free_kb = None;

    for line in meminfo.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok());
        match key {
            "MemTotal" => total_kb = value,
            "MemAvailable" => available_kb = value,
            "SwapTotal" => swap_total_kb = value,
            "SwapFree" => swap_free_kb = value,
            _ => {}
        }
    }

    let total_kb = total_kb.context("MemTotal missing from /proc/meminfo")?;
    let available_kb = available_kb.context("MemAvailable missing from /proc/meminfo")?;
    if total_kb == 0 {
        bail!("MemTotal is zero in /proc/meminfo");
    }

    let used_kb = total_kb.saturating_sub(available_kb);
    let swap_percent = match (swap_total_kb, swap_free_kb) {
        (Some(swap_total), Some(swap_free)) if swap_total > 0 => {
            (swap_total - swap_free.min(swap_total)) as f64 / swap_total as f64 * 100.0
        }
        _ => 0.0,
    };

    Ok(MemoryMetrics {
        total_mb: total_kb as f64 / 1024.0,
        available_mb: available_kb as f64 / 1024.0,
        used_mb: used_kb as f64 / 1024.0,
        percent: used_kb as f64 / total_kb as f64 * 100.0,
        swap_percent,
    })
}
