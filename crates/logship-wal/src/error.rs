//! WAL Error Types
//!
//! This module defines all error types that can occur while writing, reading
//! or watching a segmented WAL.
//!
//! ## Error Categories
//!
//! ### Directory Errors
//! - `NonSequentialSegments`: the segment files on disk have a numbering gap
//! - `NoSegments`: the WAL directory exists but holds no segments yet
//!
//! ### Segment Errors
//! - `SegmentOpen`: a segment file could not be opened for reading
//! - `Corrupt`: a record frame failed validation (oversized length or
//!   checksum mismatch)
//!
//! ### Pipeline Errors
//! - `Decode`: the record payload could not be decoded
//! - `Consumer`: a downstream consumer callback failed
//!
//! ## Policy
//!
//! The watcher maps these onto its retry behavior: directory and open errors
//! abort the current run (retried after backoff); `Corrupt` is fatal while
//! tailing but warned-and-skipped while replaying a sealed segment; `Decode`
//! and `Consumer` abort the current watch. End-of-available-data is not an
//! error at all - the reader reports it as `Ok(None)`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error type consumer callbacks may return; the watcher wraps it into
/// [`Error::Consumer`].
pub type ConsumerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("segments are not sequential: {prev} followed by {next}")]
    NonSequentialSegments { prev: u64, next: u64 },

    #[error("no segments in WAL directory")]
    NoSegments,

    #[error("failed to open segment {segment}: {source}")]
    SegmentOpen {
        segment: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    #[error("decode error: {0}")]
    Decode(#[from] logship_core::CodecError),

    #[error("consumer error: {0}")]
    Consumer(#[source] ConsumerError),
}
