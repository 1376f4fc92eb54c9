//! WAL Writer
//!
//! Append side of the segmented WAL: frames encoded records into the current
//! segment file and cuts new segments. The watcher never writes; this type
//! exists for the shipping agent's write path and for tests that need real
//! segment files.
//!
//! ## Segment Lifecycle
//!
//! 1. `open` continues the highest-numbered segment on disk, or creates
//!    segment 0 in an empty directory.
//! 2. `append` frames one record (`length | crc32 | payload`) and writes it.
//! 3. `roll_segment` syncs the current file and starts the next-numbered
//!    one. Sealing is implied: readers treat a segment as sealed as soon as
//!    a higher-numbered file exists.
//!
//! Writes are appends only; a segment file is never modified after the
//! writer rolls past it.

use crate::error::Result;
use crate::reader::FRAME_HEADER_SIZE;
use crate::segment::{first_and_last, segment_path};
use bytes::BytesMut;
use logship_core::{encode_record, WalRecord};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Appends framed records to the current segment of a WAL directory.
pub struct WalWriter {
    dir: PathBuf,
    segment: u64,
    file: File,
    offset: u64,
    scratch: BytesMut,
}

impl WalWriter {
    /// Open a WAL directory for appending, creating it if needed.
    ///
    /// Continues the highest existing segment, or creates segment 0.
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let segment = match first_and_last(dir).await? {
            Some((_, last)) => last,
            None => 0,
        };
        let (file, offset) = open_segment(dir, segment).await?;

        info!(dir = %dir.display(), segment, offset, "WAL opened for appending");

        Ok(Self {
            dir: dir.to_path_buf(),
            segment,
            file,
            offset,
            scratch: BytesMut::new(),
        })
    }

    /// Segment currently being appended to.
    pub fn current_segment(&self) -> u64 {
        self.segment
    }

    /// Byte size of the current segment.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Encode and append one record to the current segment.
    pub async fn append(&mut self, record: &WalRecord) -> Result<()> {
        self.scratch.clear();
        self.scratch.extend_from_slice(&[0u8; FRAME_HEADER_SIZE]);
        encode_record(record, &mut self.scratch);

        let payload = &self.scratch[FRAME_HEADER_SIZE..];
        let length = (payload.len() as u32).to_le_bytes();
        let crc = crc32fast::hash(payload).to_le_bytes();
        self.scratch[0..4].copy_from_slice(&length);
        self.scratch[4..8].copy_from_slice(&crc);

        self.file.write_all(&self.scratch).await?;
        self.offset += self.scratch.len() as u64;
        Ok(())
    }

    /// Flush and fsync the current segment.
    pub async fn sync(&mut self) -> Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }

    /// Sync the current segment and cut the next one. Returns the new
    /// segment id.
    pub async fn roll_segment(&mut self) -> Result<u64> {
        self.sync().await?;

        self.segment += 1;
        let (file, offset) = open_segment(&self.dir, self.segment).await?;
        self.file = file;
        self.offset = offset;

        debug!(segment = self.segment, "cut new WAL segment");
        Ok(self.segment)
    }
}

async fn open_segment(dir: &Path, segment: u64) -> Result<(File, u64)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(segment_path(dir, segment))
        .await?;
    let offset = file.metadata().await?.len();
    Ok((file, offset))
}
