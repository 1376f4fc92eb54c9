//! Watcher Metrics
//!
//! Prometheus observables for the WAL watcher, all labeled by watcher
//! instance name so several watchers can share one registry:
//!
//! | Name | Kind | Meaning |
//! |------|------|---------|
//! | `logship_wal_watchers_running` | gauge | incremented on start, decremented on stop |
//! | `logship_wal_watcher_current_segment` | gauge | segment id at the top of each run iteration |
//! | `logship_wal_watcher_records_read_total` | counter | raw records returned by the live reader |
//! | `logship_wal_watcher_record_decode_fails_total` | counter | codec failures |
//! | `logship_wal_watcher_segment_advances_total` | counter | segment-end notifications |

use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};

/// Metric handles for one or more watcher instances.
#[derive(Clone)]
pub struct WatcherMetrics {
    pub watchers_running: IntGaugeVec,
    pub current_segment: IntGaugeVec,
    pub records_read: IntCounterVec,
    pub record_decode_fails: IntCounterVec,
    pub segment_advances: IntCounterVec,
}

impl WatcherMetrics {
    /// Create and register the watcher metrics against `registry`.
    pub fn new(registry: &Registry) -> Self {
        let watchers_running = IntGaugeVec::new(
            Opts::new("logship_wal_watchers_running", "Watchers currently running"),
            &["watcher"],
        )
        .expect("metric can be created");

        let current_segment = IntGaugeVec::new(
            Opts::new(
                "logship_wal_watcher_current_segment",
                "Segment the watcher is currently reading",
            ),
            &["watcher"],
        )
        .expect("metric can be created");

        let records_read = IntCounterVec::new(
            Opts::new(
                "logship_wal_watcher_records_read_total",
                "Raw records read from the WAL",
            ),
            &["watcher"],
        )
        .expect("metric can be created");

        let record_decode_fails = IntCounterVec::new(
            Opts::new(
                "logship_wal_watcher_record_decode_fails_total",
                "WAL records that failed to decode",
            ),
            &["watcher"],
        )
        .expect("metric can be created");

        let segment_advances = IntCounterVec::new(
            Opts::new(
                "logship_wal_watcher_segment_advances_total",
                "Segments consumed fully",
            ),
            &["watcher"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(watchers_running.clone()))
            .expect("watchers_running can be registered");
        registry
            .register(Box::new(current_segment.clone()))
            .expect("current_segment can be registered");
        registry
            .register(Box::new(records_read.clone()))
            .expect("records_read can be registered");
        registry
            .register(Box::new(record_decode_fails.clone()))
            .expect("record_decode_fails can be registered");
        registry
            .register(Box::new(segment_advances.clone()))
            .expect("segment_advances can be registered");

        Self {
            watchers_running,
            current_segment,
            records_read,
            record_decode_fails,
            segment_advances,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration() {
        let registry = Registry::new();
        let metrics = WatcherMetrics::new(&registry);

        metrics.records_read.with_label_values(&["w1"]).inc();
        metrics.current_segment.with_label_values(&["w1"]).set(3);

        assert_eq!(metrics.records_read.with_label_values(&["w1"]).get(), 1);
        assert_eq!(metrics.current_segment.with_label_values(&["w1"]).get(), 3);
    }

    #[test]
    fn test_instances_are_labeled_independently() {
        let registry = Registry::new();
        let metrics = WatcherMetrics::new(&registry);

        metrics.watchers_running.with_label_values(&["a"]).inc();
        metrics.watchers_running.with_label_values(&["b"]).inc();
        metrics.watchers_running.with_label_values(&["b"]).inc();

        assert_eq!(metrics.watchers_running.with_label_values(&["a"]).get(), 1);
        assert_eq!(metrics.watchers_running.with_label_values(&["b"]).get(), 2);
    }
}
