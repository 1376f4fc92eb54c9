#![no_main]

use libfuzzer_sys::fuzz_target;
use logship_wal::LiveReader;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Treat arbitrary bytes as a segment file and stream records out of it.
    // The reader must terminate (no record can be smaller than its frame
    // header) and must fail cleanly on:
    // - Truncated frame headers and payloads
    // - Oversized length fields
    // - Bad CRC32 checksums
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("00000000");
    let mut file = std::fs::File::create(&path).expect("create segment");
    file.write_all(data).expect("write segment");
    file.flush().expect("flush segment");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    rt.block_on(async {
        let mut reader = LiveReader::open(&path, 0).await.expect("open segment");
        loop {
            match reader.next_record().await {
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break,
            }
        }
        // The consumed offset never runs past the file.
        assert!(reader.offset() <= data.len() as u64);
    });
});
