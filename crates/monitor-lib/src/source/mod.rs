//! Metric sources
//!
//! Each source fills its own sections of the per-cycle snapshot. Sources
//! are independent: a failure in one is recorded on the snapshot by the
//! coordinator and never blocks the others.

mod access_log;
mod jvm;
mod os;

pub use access_log::{parse_access_log_line, AccessLogEntry, AccessLogSource};
pub use jvm::JvmSource;
pub use os::OsSource;

use crate::models::MetricSnapshot;
use anyhow::Result;

pub use async_trait::async_trait;

/// Trait for metric-producing collaborators
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Stable source name, used as the error key on the snapshot
    fn name(&self) -> &str;

    /// Fill this source's sections of the snapshot.
    ///
    /// On error the snapshot must be left with this source's sections at
    /// their defaults; partially written sections are not allowed.
    async fn collect(&self, snapshot: &mut MetricSnapshot) -> Result<()>;

    /// Whether the source's backend is currently reachable. Sources without
    /// a connection concept report true.
    fn connected(&self) -> bool {
        true
    }
}
