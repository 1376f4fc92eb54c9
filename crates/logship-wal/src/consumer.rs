//! Watcher Consumer Interface
//!
//! The watcher hands every decoded record to a `WatcherConsumer`: first all
//! series declarations of the record (so a stream reference is known before
//! any entry mentions it), then all entry batches, then - once a segment has
//! been read fully and the watcher is moving on - a `segment_end` callback.
//!
//! ## Threading Contract
//!
//! All three callbacks are invoked synchronously from the watcher's single
//! background task, never concurrently with each other. Implementations are
//! shared behind `Arc` so they need interior mutability to accumulate state,
//! but they do not need to defend against concurrent calls from the same
//! watcher.
//!
//! `segment_end` is informational only: consumers may flush buffered state
//! there (segment boundaries are the ordering barrier across segments) but
//! must not block, since it runs on the read path.

use crate::error::ConsumerError;
use logship_core::{EntryBatch, SeriesDecl};

/// Downstream recipient of decoded WAL records.
pub trait WatcherConsumer: Send + Sync {
    /// A stream declaration was read. Declarations of a record are always
    /// delivered before its entry batches.
    fn consume_series(&self, series: &SeriesDecl) -> Result<(), ConsumerError>;

    /// A batch of entries was read for a previously declared stream.
    fn consume_entries(&self, batch: &EntryBatch) -> Result<(), ConsumerError>;

    /// Segment `segment` was consumed fully and the watcher is advancing.
    /// Must not block.
    fn segment_end(&self, segment: u64);
}
