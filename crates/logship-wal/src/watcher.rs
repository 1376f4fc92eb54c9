//! WAL Watcher
//!
//! Tails a segmented WAL directory and dispatches every record, in write
//! order, to a [`WatcherConsumer`]. This is the read side of the shipping
//! pipeline: a separate writer process appends records to the newest segment
//! and cuts new segments; the watcher follows along.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐ append  ┌─────────────────┐  discover ┌─────────┐
//! │  Writer  │────────►│ 00000000        │◄──────────│ Watcher │
//! └──────────┘         │ 00000001        │   read    └────┬────┘
//!                      │ 00000002 (live) │                │ dispatch
//!                      └─────────────────┘                ▼
//!                                                   ┌──────────┐
//!                                                   │ Consumer │
//!                                                   └──────────┘
//! ```
//!
//! ## Two Reading Modes
//!
//! - **Tail**: the segment is the newest one on disk and may still be
//!   extended. End-of-available-data is the steady state between writer
//!   flushes; corruption is fatal (the outer loop backs off and retries).
//! - **Replay**: a higher-numbered segment exists, so the segment is sealed.
//!   Errors are logged as "may have dropped data" and swallowed so a corrupt
//!   sealed segment cannot wedge the watcher; making progress past it wins
//!   over completeness.
//!
//! ## Ordering Guarantees
//!
//! - Records within a segment are dispatched in file order.
//! - All of segment `N`, then `segment_end(N)`, then segment `N + 1`.
//! - Within one record, every series declaration is dispatched before any
//!   entry batch.
//!
//! ## Startup and Failure Semantics
//!
//! A run starts at the *newest* segment - older sealed segments are not
//! replayed on startup. Consumers that need history must drive their own
//! replay externally. When a run fails, the watcher logs, sleeps for the
//! configured backoff and starts a fresh run at the then-newest segment;
//! when the retry lands in the same segment, reading resumes at the offset
//! after the last dispatched record, so a consumer error does not cause
//! re-dispatch. The watcher never stops itself; only [`Watcher::stop`] ends
//! it.
//!
//! ## Usage
//!
//! ```ignore
//! use logship_wal::{Watcher, WatcherConfig, WatcherMetrics};
//!
//! let metrics = WatcherMetrics::new(&registry);
//! let config = WatcherConfig::new("/var/lib/logship/wal", "shipper-0");
//! let mut watcher = Watcher::new(config, metrics, consumer);
//!
//! watcher.start();
//! // ... runs in the background ...
//! watcher.stop().await;
//! ```

use crate::config::WatcherConfig;
use crate::consumer::WatcherConsumer;
use crate::error::{Error, Result};
use crate::metrics::WatcherMetrics;
use crate::reader::LiveReader;
use crate::segment::{first_and_last, segment_path, segment_size};
use logship_core::pool;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, warn};

/// Tails a WAL directory from a background task.
///
/// `start` spawns the worker; `stop` signals shutdown and waits for it to
/// finish. One watcher per directory; restarting a stopped watcher is not
/// supported.
pub struct Watcher {
    config: WatcherConfig,
    metrics: WatcherMetrics,
    consumer: Arc<dyn WatcherConsumer>,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Watcher {
    pub fn new(
        config: WatcherConfig,
        metrics: WatcherMetrics,
        consumer: Arc<dyn WatcherConsumer>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            metrics,
            consumer,
            shutdown_tx,
            handle: None,
        }
    }

    /// Spawn the watcher's main loop. Call once.
    pub fn start(&mut self) {
        self.metrics
            .watchers_running
            .with_label_values(&[self.config.name.as_str()])
            .inc();

        let task = WatcherTask {
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            consumer: Arc::clone(&self.consumer),
            shutdown: self.shutdown_tx.subscribe(),
            resume: None,
        };
        self.handle = Some(tokio::spawn(task.main_loop()));
    }

    /// Request shutdown and wait for the main loop to finish. Call once,
    /// after [`Watcher::start`].
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        self.metrics
            .watchers_running
            .with_label_values(&[self.config.name.as_str()])
            .dec();
    }
}

/// State owned by the background task. Single-threaded with respect to
/// itself: no locking over the current segment, the reader or the tickers.
struct WatcherTask {
    config: WatcherConfig,
    metrics: WatcherMetrics,
    consumer: Arc<dyn WatcherConsumer>,
    shutdown: watch::Receiver<bool>,
    /// Offset after the last record pulled from (segment, offset). When a
    /// retry re-enters the same segment, reading resumes here so records
    /// already handed to the consumer are not re-dispatched.
    resume: Option<(u64, u64)>,
}

impl WatcherTask {
    fn stop_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn name(&self) -> &str {
        self.config.name.as_str()
    }

    /// Retry `run` until shutdown, sleeping between attempts.
    async fn main_loop(mut self) {
        loop {
            if self.stop_requested() {
                break;
            }

            match self.run().await {
                Ok(()) => {}
                Err(Error::NoSegments) => {
                    debug!(watcher = self.name(), "no segments in WAL directory yet");
                }
                Err(e) => {
                    error!(watcher = self.name(), error = %e, "error tailing WAL");
                }
            }

            let mut shutdown = self.shutdown.clone();
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.config.backoff) => {}
            }
        }

        debug!(watcher = self.name(), "watcher stopped");
    }

    /// One run: jump to the newest segment and follow the WAL until
    /// shutdown, the test segment cap, or an error.
    async fn run(&mut self) -> Result<()> {
        let Some((_, newest)) = first_and_last(&self.config.wal_dir).await? else {
            return Err(Error::NoSegments);
        };

        let mut last = newest;
        let mut current = newest;
        debug!(watcher = self.name(), current, "tailing WAL");

        while !self.stop_requested() {
            self.metrics
                .current_segment
                .with_label_values(&[self.name()])
                .set(current as i64);

            // A segment with a higher-numbered successor on disk is sealed;
            // only the newest one is tailed.
            let tail = current >= last;
            debug!(watcher = self.name(), segment = current, tail, "processing segment");
            self.watch_segment(current, tail).await?;

            // A shutdown-triggered return is not a consumed segment; leave
            // without signaling a segment boundary.
            if self.stop_requested() {
                return Ok(());
            }

            // For testing: end the run (not the watcher) at a fixed segment.
            if self.config.max_segment == Some(current) {
                return Ok(());
            }

            self.consumer.segment_end(current);
            self.metrics
                .segment_advances
                .with_label_values(&[self.name()])
                .inc();
            current += 1;

            // Segments cut while the previous one was being drained are
            // already sealed; refresh the newest id so they replay.
            if let Some((_, newest)) = first_and_last(&self.config.wal_dir).await? {
                last = newest;
            }
        }

        Ok(())
    }

    /// Read one segment to its end (replay) or until a newer segment is cut
    /// (tail).
    async fn watch_segment(&mut self, segment: u64, tail: bool) -> Result<()> {
        let path = segment_path(&self.config.wal_dir, segment);
        let start_offset = match self.resume {
            Some((resume_segment, offset)) if resume_segment == segment => offset,
            _ => 0,
        };
        let mut reader = LiveReader::open(&path, start_offset)
            .await
            .map_err(|source| Error::SegmentOpen { segment, source })?;

        if !tail {
            return self.replay_segment(&mut reader, segment).await;
        }

        let mut read_tick = interval(self.config.read_period);
        let mut segment_tick = interval(self.config.segment_check_period);
        let mut checkpoint_tick = interval(self.config.checkpoint_period);
        read_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        segment_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        checkpoint_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut shutdown = self.shutdown.clone();
        loop {
            if self.stop_requested() {
                return Ok(());
            }

            tokio::select! {
                _ = shutdown.changed() => return Ok(()),

                _ = segment_tick.tick() => {
                    let Some((_, last)) = first_and_last(&self.config.wal_dir).await? else {
                        continue;
                    };
                    if last <= segment {
                        continue;
                    }

                    // A newer segment exists: drain what is left of this one
                    // and let the run loop advance. Errors here are fatal,
                    // as on any tail read.
                    return self.read_segment(&mut reader, segment).await;
                }

                _ = checkpoint_tick.tick() => {
                    // Reserved for reconciling with writer checkpoints.
                }

                _ = read_tick.tick() => {
                    self.read_segment(&mut reader, segment).await?;
                }
            }
        }
    }

    /// Drain a sealed segment once. All errors are swallowed after a
    /// warning: advancing past a corrupt sealed segment beats retrying it
    /// forever.
    async fn replay_segment(&mut self, reader: &mut LiveReader, segment: u64) -> Result<()> {
        let size = segment_size(&self.config.wal_dir, segment).await?;

        match self.read_segment(reader, segment).await {
            Err(e) => {
                warn!(
                    watcher = self.name(),
                    segment,
                    read = reader.offset(),
                    size,
                    error = %e,
                    "ignoring error while replaying segment, may have dropped data"
                );
            }
            Ok(()) if reader.offset() != size && !self.stop_requested() => {
                warn!(
                    watcher = self.name(),
                    segment,
                    read = reader.offset(),
                    size,
                    "expected to read whole segment, may have dropped data"
                );
            }
            Ok(()) => {}
        }
        Ok(())
    }

    /// Pull records until none are currently available, shutdown is
    /// requested, or an error occurs.
    async fn read_segment(&mut self, reader: &mut LiveReader, segment: u64) -> Result<()> {
        loop {
            if self.stop_requested() {
                return Ok(());
            }

            let Some(record) = reader.next_record().await? else {
                return Ok(());
            };
            self.resume = Some((segment, reader.offset()));
            self.metrics
                .records_read
                .with_label_values(&[self.name()])
                .inc();

            self.decode_and_dispatch(&record)?;
        }
    }

    /// Decode one record and hand it to the consumer: series declarations
    /// first, then entry batches, so entries never reference an undeclared
    /// stream. The first consumer error is remembered but dispatch runs to
    /// completion, keeping the record whole from the consumer's view.
    fn decode_and_dispatch(&self, record: &[u8]) -> Result<()> {
        let mut decoded = pool::get();
        if let Err(e) = logship_core::decode_record(record, &mut decoded) {
            self.metrics
                .record_decode_fails
                .with_label_values(&[self.name()])
                .inc();
            return Err(Error::Decode(e));
        }

        let mut first_err = None;
        for series in &decoded.series {
            if let Err(e) = self.consumer.consume_series(series) {
                first_err.get_or_insert(Error::Consumer(e));
            }
        }
        for batch in &decoded.entries {
            if let Err(e) = self.consumer.consume_entries(batch) {
                first_err.get_or_insert(Error::Consumer(e));
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsumerError;
    use std::result::Result;
    use bytes::BytesMut;
    use logship_core::{encode_record, Entry, EntryBatch, Label, SeriesDecl, WalRecord};
    use prometheus::Registry;
    use std::sync::Mutex;

    /// Records every callback; optionally fails specific series refs once.
    #[derive(Default)]
    struct RecordingConsumer {
        calls: Mutex<Vec<String>>,
        fail_series: Mutex<Vec<u64>>,
    }

    impl WatcherConsumer for RecordingConsumer {
        fn consume_series(&self, series: &SeriesDecl) -> Result<(), ConsumerError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("series:{}", series.stream_ref));
            if self.fail_series.lock().unwrap().contains(&series.stream_ref) {
                return Err(format!("series {} rejected", series.stream_ref).into());
            }
            Ok(())
        }

        fn consume_entries(&self, batch: &EntryBatch) -> Result<(), ConsumerError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("entries:{}", batch.stream_ref));
            Ok(())
        }

        fn segment_end(&self, segment: u64) {
            self.calls.lock().unwrap().push(format!("end:{}", segment));
        }
    }

    fn task_with(consumer: Arc<RecordingConsumer>) -> WatcherTask {
        let (_tx, rx) = watch::channel(false);
        WatcherTask {
            config: WatcherConfig::new("/nonexistent", "test"),
            metrics: WatcherMetrics::new(&Registry::new()),
            consumer,
            shutdown: rx,
            resume: None,
        }
    }

    fn encode(record: &WalRecord) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_record(record, &mut buf);
        buf
    }

    fn two_by_two() -> WalRecord {
        WalRecord {
            series: vec![
                SeriesDecl {
                    stream_ref: 1,
                    labels: vec![Label::new("job", "a")],
                },
                SeriesDecl {
                    stream_ref: 2,
                    labels: vec![Label::new("job", "b")],
                },
            ],
            entries: vec![
                EntryBatch {
                    stream_ref: 1,
                    entries: vec![Entry::new(1, "x")],
                },
                EntryBatch {
                    stream_ref: 2,
                    entries: vec![Entry::new(2, "y")],
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_dispatch_series_before_entries() {
        let consumer = Arc::new(RecordingConsumer::default());
        let task = task_with(Arc::clone(&consumer));

        task.decode_and_dispatch(&encode(&two_by_two())).unwrap();

        let calls = consumer.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec!["series:1", "series:2", "entries:1", "entries:2"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_completes_record_despite_consumer_error() {
        let consumer = Arc::new(RecordingConsumer::default());
        consumer.fail_series.lock().unwrap().push(1);
        let task = task_with(Arc::clone(&consumer));

        let err = task.decode_and_dispatch(&encode(&two_by_two())).unwrap_err();
        match err {
            Error::Consumer(e) => assert!(e.to_string().contains("series 1")),
            other => panic!("expected Consumer error, got {:?}", other),
        }

        // Every callback of the record still ran.
        let calls = consumer.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec!["series:1", "series:2", "entries:1", "entries:2"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_counts_decode_failures() {
        let consumer = Arc::new(RecordingConsumer::default());
        let task = task_with(Arc::clone(&consumer));

        let err = task.decode_and_dispatch(b"\xFF\xFF\xFF").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(
            task.metrics
                .record_decode_fails
                .with_label_values(&["test"])
                .get(),
            1
        );
        assert!(consumer.calls.lock().unwrap().is_empty());
    }
}
