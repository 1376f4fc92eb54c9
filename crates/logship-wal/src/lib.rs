//! Logship WAL
//!
//! A segmented write-ahead log on the local filesystem, plus the watcher
//! that tails it. The WAL decouples the log collection path from shipping:
//! the collector appends records durably, and a watcher follows the segment
//! files and feeds a downstream consumer, surviving restarts of either side.
//!
//! ## Layout on Disk
//!
//! One directory per WAL, one append-only file per segment, named by the
//! zero-padded segment id:
//!
//! ```text
//! wal/
//! ├── 00000000    (sealed)
//! ├── 00000001    (sealed)
//! └── 00000002    (live - still being appended to)
//! ```
//!
//! A segment is sealed the moment a higher-numbered file exists; there is no
//! in-band end marker.
//!
//! ## Main Components
//!
//! ### WalWriter
//! Appends framed records to the live segment and cuts new segments.
//!
//! ### LiveReader
//! Streams records out of one segment file, safely racing a concurrent
//! writer: a partially flushed record is never consumed half-way.
//!
//! ### Watcher
//! The orchestrator. Discovers segments, replays sealed ones, tails the live
//! one, dispatches decoded records to a [`WatcherConsumer`], and advances
//! across segment boundaries with retry-and-backoff error handling.
//!
//! ## Usage
//!
//! ```ignore
//! use logship_wal::{Watcher, WatcherConfig, WatcherMetrics};
//! use prometheus::Registry;
//! use std::sync::Arc;
//!
//! let registry = Registry::new();
//! let metrics = WatcherMetrics::new(&registry);
//! let config = WatcherConfig::new("/var/lib/logship/wal", "shipper-0");
//!
//! let mut watcher = Watcher::new(config, metrics, Arc::new(my_consumer));
//! watcher.start();
//! // ...
//! watcher.stop().await;
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod metrics;
pub mod reader;
pub mod segment;
pub mod watcher;
pub mod writer;

pub use config::WatcherConfig;
pub use consumer::WatcherConsumer;
pub use error::{ConsumerError, Error, Result};
pub use metrics::WatcherMetrics;
pub use reader::LiveReader;
pub use watcher::Watcher;
pub use writer::WalWriter;
