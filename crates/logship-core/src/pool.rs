//! Decoded-Record Pool
//!
//! The watcher decodes every WAL record into a `WalRecord` before dispatch.
//! Decoding into a fresh record would allocate three vectors per record on
//! the hot path, so decoded records are pooled process-wide with a get/put
//! discipline: `get()` hands out a cleared record (popping a recycled one
//! when available) and dropping the guard returns it.
//!
//! The pool is capped; when full, returned records are simply dropped.

use crate::record::WalRecord;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Upper bound on pooled records kept alive.
const MAX_POOLED: usize = 64;

static POOL: Mutex<Vec<WalRecord>> = Mutex::new(Vec::new());

/// Guard around a pooled `WalRecord`. Dereferences to the record; returns it
/// to the pool on drop.
pub struct PooledRecord {
    record: Option<WalRecord>,
}

/// Acquire a record from the pool. The record is always empty on return.
pub fn get() -> PooledRecord {
    let mut record = POOL
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .pop()
        .unwrap_or_default();
    record.clear();
    PooledRecord {
        record: Some(record),
    }
}

impl Deref for PooledRecord {
    type Target = WalRecord;

    fn deref(&self) -> &WalRecord {
        self.record.as_ref().expect("record present until drop")
    }
}

impl DerefMut for PooledRecord {
    fn deref_mut(&mut self) -> &mut WalRecord {
        self.record.as_mut().expect("record present until drop")
    }
}

impl Drop for PooledRecord {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            let mut pool = POOL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if pool.len() < MAX_POOLED {
                pool.push(record);
            }
        }
    }
}
