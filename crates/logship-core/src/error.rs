//! Codec Error Types
//!
//! Decode errors for record payloads. Payloads reach the decoder from files
//! another process is writing, so every length and string is treated as
//! untrusted: truncation and malformed UTF-8 surface here rather than as
//! panics.
//!
//! All codec operations return `Result<T>`, aliased to
//! `Result<T, CodecError>`, so callers propagate with `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid or truncated varint in record")]
    InvalidVarint,

    #[error("length {len} exceeds {remaining} remaining bytes")]
    LengthOutOfBounds { len: u64, remaining: usize },

    #[error("label is not valid UTF-8")]
    InvalidLabel(#[from] std::string::FromUtf8Error),

    #[error("record has trailing garbage: {remaining} bytes after decode")]
    TrailingBytes { remaining: usize },
}
