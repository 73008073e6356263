//! Heap growth trend prediction
//!
//! Maintains a bounded time-ordered history of heap samples and projects
//! time-to-exhaustion from the growth rate over a short trailing window.
//! A two-point slope over the window is cheap and reacts quickly to sudden
//! growth; it is an early-warning signal, not a precise ETA.

use crate::models::{HeapSample, OomPrediction};

/// Samples older than this (relative to the newest sample) are dropped
const HISTORY_WINDOW_SECS: f64 = 3600.0;

/// Predicts heap exhaustion from recent growth
#[derive(Debug, Default)]
pub struct TrendPredictor {
    samples: Vec<HeapSample>,
}

impl TrendPredictor {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Append a heap sample and prune history outside the trailing hour.
    pub fn record(&mut self, sample: HeapSample) {
        let cutoff = sample.timestamp - HISTORY_WINDOW_SECS;
        self.samples.push(sample);
        self.samples.retain(|s| s.timestamp > cutoff);
    }

    /// Predict time to heap exhaustion from samples in the trailing window.
    ///
    /// Returns `None` when fewer than two samples fall inside the window,
    /// when timestamps are inconsistent, or when the heap is not growing.
    pub fn predict(&self, window_secs: f64, now: f64) -> Option<OomPrediction> {
        // Window edge is inclusive so a sample taken exactly one window ago
        // still anchors the slope
        let cutoff = now - window_secs;
        let recent: Vec<&HeapSample> = self
            .samples
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .collect();
        if recent.len() < 2 {
            return None;
        }

        let first = recent[0];
        let last = recent[recent.len() - 1];

        let time_diff = last.timestamp - first.timestamp;
        if time_diff <= 0.0 {
            return None;
        }

        let growth_rate = (last.used as f64 - first.used as f64) / time_diff;
        if growth_rate <= 0.0 {
            return None;
        }

        let available = last.max as f64 - last.used as f64;
        let time_to_oom = (available / growth_rate).max(0.0);

        let current_usage_percent = if last.max > 0 {
            last.used as f64 / last.max as f64
        } else {
            0.0
        };

        Some(OomPrediction {
            predicted: true,
            time_to_oom_seconds: time_to_oom,
            growth_rate_bytes_per_sec: growth_rate,
            current_usage_percent,
            timestamp: now,
        })
    }

    /// Retained history, oldest first; published for the heap trend chart.
    pub fn samples(&self) -> &[HeapSample] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn sample(used_mb: u64, timestamp: f64) -> HeapSample {
        HeapSample {
            used: used_mb * MB,
            max: 1024 * MB,
            timestamp,
        }
    }

    #[test]
    fn test_insufficient_history_yields_no_prediction() {
        let mut predictor = TrendPredictor::new();
        assert!(predictor.predict(300.0, 0.0).is_none());

        predictor.record(sample(500, 0.0));
        assert!(predictor.predict(300.0, 10.0).is_none());
    }

    #[test]
    fn test_growing_heap_predicts_oom() {
        let mut predictor = TrendPredictor::new();
        predictor.record(sample(500, 0.0));
        predictor.record(sample(600, 300.0));

        let prediction = predictor.predict(300.0, 300.0).unwrap();

        // 100 MB over 300 s is ~0.333 MB/s; 424 MB of headroom gives ~1272 s
        let expected_rate = 100.0 * MB as f64 / 300.0;
        assert!((prediction.growth_rate_bytes_per_sec - expected_rate).abs() < 1.0);
        assert!((prediction.time_to_oom_seconds - 1272.0).abs() < 1.0);
        assert!(prediction.predicted);
        assert!((prediction.current_usage_percent - 600.0 / 1024.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_heap_yields_no_prediction() {
        let mut predictor = TrendPredictor::new();
        predictor.record(sample(500, 0.0));
        predictor.record(sample(500, 300.0));
        assert!(predictor.predict(300.0, 300.0).is_none());
    }

    #[test]
    fn test_shrinking_heap_yields_no_prediction() {
        let mut predictor = TrendPredictor::new();
        predictor.record(sample(600, 0.0));
        predictor.record(sample(500, 300.0));
        assert!(predictor.predict(300.0, 300.0).is_none());
    }

    #[test]
    fn test_zero_time_delta_yields_no_prediction() {
        let mut predictor = TrendPredictor::new();
        predictor.record(sample(500, 100.0));
        predictor.record(sample(600, 100.0));
        assert!(predictor.predict(300.0, 100.0).is_none());
    }

    #[test]
    fn test_window_excludes_old_samples() {
        let mut predictor = TrendPredictor::new();
        predictor.record(sample(100, 0.0));
        predictor.record(sample(600, 1000.0));

        // Only the newest sample is inside the 300 s window
        assert!(predictor.predict(300.0, 1000.0).is_none());
    }

    #[test]
    fn test_two_point_slope_ignores_middle_samples() {
        let mut predictor = TrendPredictor::new();
        predictor.record(sample(500, 0.0));
        predictor.record(sample(900, 150.0)); // spike in the middle
        predictor.record(sample(600, 300.0));

        let prediction = predictor.predict(300.0, 300.0).unwrap();
        let expected_rate = 100.0 * MB as f64 / 300.0;
        assert!((prediction.growth_rate_bytes_per_sec - expected_rate).abs() < 1.0);
    }

    #[test]
    fn test_history_pruned_to_one_hour() {
        let mut predictor = TrendPredictor::new();
        predictor.record(sample(100, 0.0));
        predictor.record(sample(200, 1800.0));
        predictor.record(sample(300, 4000.0));

        // The t=0 sample is more than an hour behind the newest
        assert_eq!(predictor.samples().len(), 2);
        assert!(predictor.samples().iter().all(|s| s.timestamp >= 1800.0));
    }

    #[test]
    fn test_full_heap_clamps_to_zero() {
        let mut predictor = TrendPredictor::new();
        predictor.record(sample(1000, 0.0));
        predictor.record(HeapSample {
            used: 1024 * MB,
            max: 1024 * MB,
            timestamp: 300.0,
        });

        let prediction = predictor.predict(300.0, 300.0).unwrap();
        assert_eq!(prediction.time_to_oom_seconds, 0.0);
    }
}
