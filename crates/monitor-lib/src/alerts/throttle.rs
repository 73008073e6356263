//! Alert throttling and the alert log
//!
//! Suppresses repeated alerts for the same metric key within a configured
//! cooldown window, and keeps the accepted alerts in a log that is pruned
//! explicitly by the coordinator.

use crate::models::Alert;
use std::collections::HashMap;

/// Throttle state and alert log.
///
/// `last_sent` maps each metric key to the timestamp of the last accepted
/// alert for that key. Entries are never evicted: a metric that stops
/// alerting still remembers its last alert time, so a brief quiet period
/// cannot re-arm the throttle early. The key space is the small fixed set
/// of rule metric keys, so retention is bounded in practice.
#[derive(Debug)]
pub struct AlertManager {
    throttle_secs: f64,
    last_sent: HashMap<String, f64>,
    log: Vec<Alert>,
}

impl AlertManager {
    pub fn new(throttle_minutes: u64) -> Self {
        Self {
            throttle_secs: throttle_minutes as f64 * 60.0,
            last_sent: HashMap::new(),
            log: Vec::new(),
        }
    }

    /// Accept or reject an alert against the cooldown window.
    ///
    /// On acceptance the throttle timestamp is updated and the alert is
    /// appended to the log in the same call; the two cannot diverge.
    pub fn accept(&mut self, alert: &Alert) -> bool {
        if let Some(last) = self.last_sent.get(&alert.metric) {
            if alert.timestamp - last < self.throttle_secs {
                return false;
            }
        }

        self.last_sent
            .insert(alert.metric.clone(), alert.timestamp);
        self.log.push(alert.clone());
        true
    }

    /// Accepted alerts newer than `now - max_age_secs`, in acceptance order.
    pub fn active_alerts(&self, now: f64, max_age_secs: f64) -> Vec<Alert> {
        let cutoff = now - max_age_secs;
        self.log
            .iter()
            .filter(|a| a.timestamp > cutoff)
            .cloned()
            .collect()
    }

    /// Drop log entries older than `max_age_secs`. Throttle state is not
    /// touched; pruning the log never re-arms a cooldown.
    pub fn prune(&mut self, now: f64, max_age_secs: f64) {
        let cutoff = now - max_age_secs;
        self.log.retain(|a| a.timestamp > cutoff);
    }

    /// The full (pruned) alert log, oldest first.
    pub fn log(&self) -> &[Alert] {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertLevel;

    fn alert(metric: &str, timestamp: f64) -> Alert {
        Alert {
            level: AlertLevel::Warning,
            title: "High Heap Usage".to_string(),
            message: "Heap usage is at 75.0%".to_string(),
            metric: metric.to_string(),
            value: 0.75,
            threshold: 0.7,
            timestamp,
        }
    }

    #[test]
    fn test_throttle_window_timeline() {
        let mut manager = AlertManager::new(15);

        assert!(manager.accept(&alert("heap_usage", 0.0)));
        // 10 minutes later: still inside the 15 minute window
        assert!(!manager.accept(&alert("heap_usage", 600.0)));
        // Just past the window
        assert!(manager.accept(&alert("heap_usage", 901.0)));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let mut manager = AlertManager::new(15);
        assert!(manager.accept(&alert("heap_usage", 0.0)));
        assert!(manager.accept(&alert("heap_usage", 900.0)));
    }

    #[test]
    fn test_metrics_throttle_independently() {
        let mut manager = AlertManager::new(15);
        assert!(manager.accept(&alert("heap_usage", 0.0)));
        assert!(manager.accept(&alert("cpu_usage", 1.0)));
        assert!(!manager.accept(&alert("heap_usage", 2.0)));
        assert!(!manager.accept(&alert("cpu_usage", 2.0)));
    }

    #[test]
    fn test_rejected_alerts_do_not_reset_the_window() {
        let mut manager = AlertManager::new(15);
        assert!(manager.accept(&alert("heap_usage", 0.0)));
        assert!(!manager.accept(&alert("heap_usage", 600.0)));
        // Measured from t=0, not from the rejected attempt at t=600
        assert!(manager.accept(&alert("heap_usage", 950.0)));
    }

    #[test]
    fn test_only_accepted_alerts_reach_the_log() {
        let mut manager = AlertManager::new(15);
        manager.accept(&alert("heap_usage", 0.0));
        manager.accept(&alert("heap_usage", 100.0));
        assert_eq!(manager.log().len(), 1);
    }

    #[test]
    fn test_active_alerts_filters_by_recency() {
        let mut manager = AlertManager::new(0);
        manager.accept(&alert("heap_usage", 0.0));
        manager.accept(&alert("heap_usage", 500.0));
        manager.accept(&alert("heap_usage", 900.0));

        let active = manager.active_alerts(1000.0, 300.0);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].timestamp, 900.0);
    }

    #[test]
    fn test_prune_drops_old_entries_but_keeps_throttle_state() {
        let mut manager = AlertManager::new(15);
        manager.accept(&alert("heap_usage", 0.0));

        manager.prune(5000.0, 3600.0);
        assert!(manager.log().is_empty());

        // The throttle still remembers the alert pruned from the log
        assert!(!manager.accept(&alert("heap_usage", 500.0)));
        assert!(manager.accept(&alert("heap_usage", 5000.0)));
    }
}
