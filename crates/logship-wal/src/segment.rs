//! Segment Directory Enumeration
//!
//! A WAL directory holds one append-only file per segment, named with the
//! segment's id as a zero-padded decimal (`00000000`, `00000001`, ...). The
//! padding width is the writer's naming convention; parsing accepts any
//! width, formatting must match the writer.
//!
//! The watcher is not authoritative over the directory: the writer may keep
//! auxiliary files (checkpoints, locks) next to the segments, so file names
//! that do not parse as integers are silently ignored.
//!
//! Segment ids must form a contiguous ascending run. A gap means segments
//! were removed out from under the watcher and reading on would silently
//! skip data, so enumeration fails instead.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Zero-padding width for segment file names. Fixed by the writer's naming
/// convention; readers parse any width but must format with this one.
pub const SEGMENT_NAME_WIDTH: usize = 8;

/// Path of segment `segment` inside `dir`.
pub fn segment_path(dir: &Path, segment: u64) -> PathBuf {
    dir.join(format!("{:0width$}", segment, width = SEGMENT_NAME_WIDTH))
}

/// List segment ids in `dir`, sorted ascending.
///
/// Non-numeric file names are skipped. Fails if the ids are not contiguous.
pub async fn list_segments(dir: &Path) -> Result<Vec<u64>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut segments = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if let Some(segment) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u64>().ok())
        {
            segments.push(segment);
        }
    }
    segments.sort_unstable();

    for pair in segments.windows(2) {
        if pair[0] + 1 != pair[1] {
            return Err(Error::NonSequentialSegments {
                prev: pair[0],
                next: pair[1],
            });
        }
    }
    Ok(segments)
}

/// First and last segment ids in `dir`, or `None` when the directory holds
/// no segments.
pub async fn first_and_last(dir: &Path) -> Result<Option<(u64, u64)>> {
    let segments = list_segments(dir).await?;
    match (segments.first(), segments.last()) {
        (Some(&first), Some(&last)) => Ok(Some((first, last))),
        _ => Ok(None),
    }
}

/// Size in bytes of segment `segment` in `dir`.
///
/// Fails with the underlying `NotFound` if the file was removed between
/// enumeration and sizing.
pub async fn segment_size(dir: &Path, segment: u64) -> Result<u64> {
    let metadata = tokio::fs::metadata(segment_path(dir, segment)).await?;
    Ok(metadata.len())
}
