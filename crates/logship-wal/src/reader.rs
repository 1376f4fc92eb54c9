//! Live Segment Reader
//!
//! `LiveReader` streams framed records out of a single segment file that a
//! separate process may still be appending to.
//!
//! ## Frame Format
//!
//! ```text
//! ┌─────────────┬───────────┬──────────────────┐
//! │ length      │ crc32     │ payload          │
//! │ (4 LE)      │ (4 LE)    │ (length bytes)   │
//! └─────────────┴───────────┴──────────────────┘
//! ```
//!
//! The checksum covers the payload only.
//!
//! ## Resumability
//!
//! The critical contract that makes tailing safe against a concurrent
//! writer: a record that is only partially flushed is never consumed
//! half-way. When fewer bytes than a whole frame are available,
//! `next_record` returns `Ok(None)`, keeps the partial bytes buffered, and
//! leaves the consumed offset unchanged; once the writer flushes the rest, a
//! later call yields the record exactly once.
//!
//! `Ok(None)` is end-of-available-data, not an error - while tailing it is
//! the steady state between writer flushes, while replaying a sealed segment
//! it means the segment is drained. Hard failures (oversized length field,
//! checksum mismatch, I/O errors) surface as `Err`.

use crate::error::{Error, Result};
use bytes::{Buf, Bytes, BytesMut};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Frame header size: length (4) + crc32 (4).
pub const FRAME_HEADER_SIZE: usize = 8;

/// Upper bound on a single record payload. A length field above this is
/// treated as corruption rather than an allocation request.
pub const MAX_RECORD_SIZE: u32 = 64 * 1024 * 1024;

/// Read granularity when refilling the internal buffer.
const READ_CHUNK: usize = 64 * 1024;

enum Parsed {
    Record(Bytes),
    NeedMore,
}

/// Cursor over the records of one open segment file.
pub struct LiveReader {
    file: File,
    buf: BytesMut,
    /// Byte position after the last fully consumed record.
    offset: u64,
}

impl LiveReader {
    /// Open a segment file, positioned at `start_offset`.
    ///
    /// `start_offset` must be a record boundary: 0 for a fresh segment, or
    /// an offset previously reported by [`LiveReader::offset`].
    pub async fn open(path: &Path, start_offset: u64) -> std::io::Result<Self> {
        let mut file = File::open(path).await?;
        if start_offset > 0 {
            file.seek(SeekFrom::Start(start_offset)).await?;
        }
        Ok(Self {
            file,
            buf: BytesMut::with_capacity(READ_CHUNK),
            offset: start_offset,
        })
    }

    /// Byte position after the last fully consumed record.
    ///
    /// Compared against the segment size to decide whether a replay drained
    /// the whole segment, and remembered by the watcher to resume after a
    /// failed watch without re-dispatching records.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Advance to the next fully available record.
    ///
    /// Returns `Ok(Some(payload))` for a complete record, `Ok(None)` when no
    /// complete record is available right now, and `Err` on I/O errors or
    /// corruption.
    pub async fn next_record(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Parsed::Record(payload) = self.parse_buffered()? {
                return Ok(Some(payload));
            }

            self.buf.reserve(READ_CHUNK);
            let n = self.file.read_buf(&mut self.buf).await?;
            if n == 0 {
                // Nothing more on disk right now. Any buffered partial frame
                // stays put for the next call.
                return Ok(None);
            }
        }
    }

    /// Try to parse one complete frame out of the buffer without consuming
    /// anything on failure.
    fn parse_buffered(&mut self) -> Result<Parsed> {
        if self.buf.len() < FRAME_HEADER_SIZE {
            return Ok(Parsed::NeedMore);
        }

        let length = u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        if length > MAX_RECORD_SIZE {
            return Err(Error::Corrupt {
                offset: self.offset,
                reason: format!("record length {} exceeds maximum", length),
            });
        }

        let frame_len = FRAME_HEADER_SIZE + length as usize;
        if self.buf.len() < frame_len {
            return Ok(Parsed::NeedMore);
        }

        let stored_crc = u32::from_le_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]);
        let computed_crc = crc32fast::hash(&self.buf[FRAME_HEADER_SIZE..frame_len]);
        if stored_crc != computed_crc {
            return Err(Error::Corrupt {
                offset: self.offset,
                reason: "record checksum mismatch".to_string(),
            });
        }

        let mut frame = self.buf.split_to(frame_len);
        frame.advance(FRAME_HEADER_SIZE);
        self.offset += frame_len as u64;
        Ok(Parsed::Record(frame.freeze()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn append(path: &std::path::Path, bytes: &[u8]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
    }

    #[tokio::test]
    async fn test_reads_records_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000000");
        append(&path, &frame(b"first"));
        append(&path, &frame(b"second"));

        let mut reader = LiveReader::open(&path, 0).await.unwrap();
        assert_eq!(reader.next_record().await.unwrap().unwrap(), "first");
        assert_eq!(reader.next_record().await.unwrap().unwrap(), "second");
        assert_eq!(reader.next_record().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_offset_tracks_consumed_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000000");
        let first = frame(b"abc");
        append(&path, &first);
        append(&path, &frame(b"defgh"));

        let mut reader = LiveReader::open(&path, 0).await.unwrap();
        assert_eq!(reader.offset(), 0);

        reader.next_record().await.unwrap().unwrap();
        assert_eq!(reader.offset(), first.len() as u64);

        reader.next_record().await.unwrap().unwrap();
        let size = std::fs::metadata(&path).unwrap().len();
        assert_eq!(reader.offset(), size);
    }

    #[tokio::test]
    async fn test_partial_record_is_not_consumed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000000");
        let full = frame(b"a record split across two flushes");
        let (head, tail) = full.split_at(full.len() - 10);

        append(&path, &frame(b"complete"));
        append(&path, head);

        let mut reader = LiveReader::open(&path, 0).await.unwrap();
        assert_eq!(reader.next_record().await.unwrap().unwrap(), "complete");

        // Only part of the second record is on disk: no record, offset
        // unchanged.
        let offset_before = reader.offset();
        assert_eq!(reader.next_record().await.unwrap(), None);
        assert_eq!(reader.next_record().await.unwrap(), None);
        assert_eq!(reader.offset(), offset_before);

        // The writer flushes the rest; the record is delivered exactly once.
        append(&path, tail);
        assert_eq!(
            reader.next_record().await.unwrap().unwrap(),
            "a record split across two flushes"
        );
        assert_eq!(reader.next_record().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_partial_header_is_not_consumed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000000");
        let full = frame(b"x");

        // Fewer than 8 header bytes available.
        append(&path, &full[..5]);
        let mut reader = LiveReader::open(&path, 0).await.unwrap();
        assert_eq!(reader.next_record().await.unwrap(), None);
        assert_eq!(reader.offset(), 0);

        append(&path, &full[5..]);
        assert_eq!(reader.next_record().await.unwrap().unwrap(), "x");
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000000");
        let mut bytes = frame(b"payload");
        // Flip one payload byte, leaving the stored checksum stale.
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        append(&path, &bytes);

        let mut reader = LiveReader::open(&path, 0).await.unwrap();
        match reader.next_record().await {
            Err(Error::Corrupt { offset: 0, reason }) => {
                assert!(reason.contains("checksum"), "reason: {}", reason)
            }
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_length_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000000");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(MAX_RECORD_SIZE + 1).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        append(&path, &bytes);

        let mut reader = LiveReader::open(&path, 0).await.unwrap();
        assert!(matches!(
            reader.next_record().await,
            Err(Error::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_at_offset_skips_consumed_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000000");
        let first = frame(b"already dispatched");
        append(&path, &first);
        append(&path, &frame(b"still pending"));

        let mut reader = LiveReader::open(&path, first.len() as u64).await.unwrap();
        assert_eq!(reader.offset(), first.len() as u64);
        assert_eq!(reader.next_record().await.unwrap().unwrap(), "still pending");
        assert_eq!(reader.next_record().await.unwrap(), None);
    }
}
