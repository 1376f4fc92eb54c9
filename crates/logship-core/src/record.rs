//! Record Data Model
//!
//! This module defines the decoded shape of a WAL record - the unit of data
//! the watcher hands to its consumer.
//!
//! ## Structure
//!
//! A single WAL record carries two ordered lists:
//!
//! - **Series declarations** (`SeriesDecl`): introduce a numeric stream
//!   reference together with the label set it stands for. A stream reference
//!   is only meaningful after its declaration has been seen.
//! - **Entry batches** (`EntryBatch`): a stream reference plus a batch of
//!   timestamped log lines for that stream.
//!
//! Entries may reference a series declared earlier in the same record or in
//! any prior record of the same WAL, which is why the watcher dispatches all
//! declarations of a record before any of its entry batches.
//!
//! ## Design Decisions
//!
//! - Log lines are `bytes::Bytes` so slicing a decoded record does not copy.
//! - Timestamps are milliseconds since epoch, signed, matching the rest of
//!   the shipping pipeline.
//! - `WalRecord` keeps its `Vec`s public so the pool can clear them in place
//!   and reuse their capacity.
//!
//! ## Example
//! ```ignore
//! let record = WalRecord {
//!     series: vec![SeriesDecl {
//!         stream_ref: 7,
//!         labels: vec![Label::new("job", "nginx")],
//!     }],
//!     entries: vec![EntryBatch {
//!         stream_ref: 7,
//!         entries: vec![Entry::new(1_700_000_000_000, "GET /index.html 200")],
//!     }],
//! };
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single label name/value pair attached to a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Declaration that a stream reference corresponds to a label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesDecl {
    /// Numeric stream reference, unique per WAL.
    pub stream_ref: u64,

    /// Labels identifying the stream.
    pub labels: Vec<Label>,
}

/// One timestamped log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Timestamp in milliseconds since epoch.
    pub timestamp: i64,

    /// Raw log line.
    pub line: Bytes,
}

impl Entry {
    pub fn new(timestamp: i64, line: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            line: line.into(),
        }
    }
}

/// A batch of entries for a previously declared stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryBatch {
    /// Stream reference the entries belong to.
    pub stream_ref: u64,

    /// Entries in write order.
    pub entries: Vec<Entry>,
}

/// A decoded WAL record.
///
/// Declarations come before entry batches in the dispatch order; the codec
/// preserves the order within each list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalRecord {
    pub series: Vec<SeriesDecl>,
    pub entries: Vec<EntryBatch>,
}

impl WalRecord {
    /// Clear both lists, keeping allocated capacity for reuse.
    pub fn clear(&mut self) {
        self.series.clear();
        self.entries.clear();
    }

    /// True when the record carries no declarations and no entries.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty() && self.entries.is_empty()
    }
}
