//! Record Codec
//!
//! Encode/decode between `WalRecord` and the byte payload stored inside a
//! segment frame. Framing (length prefix + CRC32) is the WAL layer's job;
//! this codec only sees the payload.
//!
//! ## Payload Layout
//!
//! ```text
//! series_count: uvarint
//!   repeat: stream_ref uvarint
//!           label_count uvarint
//!           repeat: name_len uvarint + name bytes
//!                   value_len uvarint + value bytes
//! batch_count: uvarint
//!   repeat: stream_ref uvarint
//!           entry_count uvarint
//!           repeat: timestamp zigzag-varint (ms)
//!                   line_len uvarint + line bytes
//! ```
//!
//! Series declarations always precede entry batches in the payload, matching
//! the dispatch order the watcher guarantees.
//!
//! ## Decoding Contract
//!
//! `decode_record` decodes into a caller-supplied `WalRecord` (cleared first)
//! so the watcher can reuse pooled records. Every length is bounds-checked
//! against the remaining payload before it is read; a payload that decodes
//! but leaves trailing bytes is rejected as malformed.

use crate::error::{CodecError, Result};
use crate::record::{Entry, EntryBatch, Label, SeriesDecl, WalRecord};
use crate::varint::{decode_uvarint, decode_varint, encode_uvarint, encode_varint};
use bytes::{BufMut, Bytes, BytesMut};

/// Encode a record into `buf`.
pub fn encode_record(record: &WalRecord, buf: &mut BytesMut) {
    encode_uvarint(buf, record.series.len() as u64);
    for series in &record.series {
        encode_uvarint(buf, series.stream_ref);
        encode_uvarint(buf, series.labels.len() as u64);
        for label in &series.labels {
            put_bytes(buf, label.name.as_bytes());
            put_bytes(buf, label.value.as_bytes());
        }
    }

    encode_uvarint(buf, record.entries.len() as u64);
    for batch in &record.entries {
        encode_uvarint(buf, batch.stream_ref);
        encode_uvarint(buf, batch.entries.len() as u64);
        for entry in &batch.entries {
            encode_varint(buf, entry.timestamp);
            put_bytes(buf, &entry.line);
        }
    }
}

/// Decode a payload into `record`, clearing it first.
pub fn decode_record(payload: &[u8], record: &mut WalRecord) -> Result<()> {
    record.clear();
    let mut cursor = payload;

    let series_count = read_uvarint(&mut cursor)?;
    for _ in 0..series_count {
        let stream_ref = read_uvarint(&mut cursor)?;
        let label_count = read_uvarint(&mut cursor)?;

        // Cap the preallocation by the bytes left; a count beyond that
        // cannot decode anyway.
        let mut labels = Vec::with_capacity(label_count.min(cursor.len() as u64) as usize);
        for _ in 0..label_count {
            let name = read_string(&mut cursor)?;
            let value = read_string(&mut cursor)?;
            labels.push(Label { name, value });
        }
        record.series.push(SeriesDecl { stream_ref, labels });
    }

    let batch_count = read_uvarint(&mut cursor)?;
    for _ in 0..batch_count {
        let stream_ref = read_uvarint(&mut cursor)?;
        let entry_count = read_uvarint(&mut cursor)?;

        let mut entries = Vec::with_capacity(entry_count.min(cursor.len() as u64) as usize);
        for _ in 0..entry_count {
            let timestamp = decode_varint(&mut cursor).ok_or(CodecError::InvalidVarint)?;
            let line = read_bytes(&mut cursor)?;
            entries.push(Entry { timestamp, line });
        }
        record.entries.push(EntryBatch { stream_ref, entries });
    }

    if !cursor.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: cursor.len(),
        });
    }
    Ok(())
}

fn put_bytes(buf: &mut BytesMut, bytes: &[u8]) {
    encode_uvarint(buf, bytes.len() as u64);
    buf.put_slice(bytes);
}

fn read_uvarint(cursor: &mut &[u8]) -> Result<u64> {
    decode_uvarint(cursor).ok_or(CodecError::InvalidVarint)
}

fn read_bytes(cursor: &mut &[u8]) -> Result<Bytes> {
    let len = read_uvarint(cursor)?;
    if len > cursor.len() as u64 {
        return Err(CodecError::LengthOutOfBounds {
            len,
            remaining: cursor.len(),
        });
    }
    let (head, tail) = cursor.split_at(len as usize);
    *cursor = tail;
    Ok(Bytes::copy_from_slice(head))
}

fn read_string(cursor: &mut &[u8]) -> Result<String> {
    let bytes = read_bytes(cursor)?;
    Ok(String::from_utf8(bytes.to_vec())?)
}
