//! Logship Core
//!
//! Wire-level building blocks shared by the WAL writer and the WAL watcher:
//!
//! - **Record model** (`record`): the decoded shape of a WAL record - stream
//!   series declarations and timestamped entry batches.
//! - **Varint encoding** (`varint`): variable-length integer encoding used by
//!   the record codec.
//! - **Record codec** (`codec`): encode/decode between `WalRecord` and the
//!   byte payload stored inside a segment frame.
//! - **Record pool** (`pool`): process-wide reuse of decoded records so the
//!   watcher's hot dispatch path does not allocate per record.
//!
//! Everything in this crate is synchronous and I/O free; framing, checksums
//! and file handling live in `logship-wal`.

pub mod codec;
pub mod error;
pub mod pool;
pub mod record;
pub mod varint;

pub use codec::{decode_record, encode_record};
pub use error::{CodecError, Result};
pub use pool::PooledRecord;
pub use record::{Entry, EntryBatch, Label, SeriesDecl, WalRecord};
