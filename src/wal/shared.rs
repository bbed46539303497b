//! Shared WAL handle
//!
//! `Wal` itself has no locking. `SharedWal` is the external mutex callers
//! reach for when appends come from several threads: every call takes the
//! lock for its whole duration, I/O included.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

use super::writer::Wal;
use super::Lsn;

/// Cloneable, thread-safe handle to one `Wal`
#[derive(Debug, Clone)]
pub struct SharedWal {
    inner: Arc<Mutex<Wal>>,
}

impl SharedWal {
    pub fn new(wal: Wal) -> Self {
        Self {
            inner: Arc::new(Mutex::new(wal)),
        }
    }

    /// See [`Wal::append`]
    pub fn append(&self, payload: &[u8]) -> Result<Lsn> {
        self.inner.lock().append(payload)
    }

    /// See [`Wal::flush`]
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    /// See [`Wal::rotate`]
    pub fn rotate(&self) -> Result<()> {
        self.inner.lock().rotate()
    }

    /// See [`Wal::sync`]
    pub fn sync(&self) -> Result<()> {
        self.inner.lock().sync()
    }

    /// See [`Wal::truncate`]
    pub fn truncate(&self, lsn_first: Lsn, lsn_last: Lsn) -> Result<Vec<u64>> {
        self.inner.lock().truncate(lsn_first, lsn_last)
    }

    /// Run `f` with exclusive access to the log
    pub fn with<T>(&self, f: impl FnOnce(&mut Wal) -> T) -> T {
        f(&mut *self.inner.lock())
    }

    /// Recover the `Wal` if this is the last handle
    pub fn into_inner(self) -> std::result::Result<Wal, SharedWal> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| SharedWal { inner })
    }
}
