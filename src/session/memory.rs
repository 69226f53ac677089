//! In-memory session store.

use std::sync::Mutex;

use super::{SessionStore, Snapshot, lock_error};
use crate::error::Result;

/// Thread-safe session store that lives as long as the process.
///
/// Useful for tests and for embedding the cache where no file system is
/// available.
///
/// # Example
///
/// ```rust
/// use ledger_sync::session::{InMemorySession, SessionStore};
///
/// let session = InMemorySession::new();
/// assert!(session.load().unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct InMemorySession {
    /// Stored snapshot.
    inner: Mutex<Option<Snapshot>>,
}

impl InMemorySession {
    /// Creates an empty session store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut Option<Snapshot>) -> R) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut inner))
    }
}

impl SessionStore for InMemorySession {
    #[inline]
    fn load(&self) -> Result<Option<Snapshot>> {
        self.with_lock(|inner| inner.clone())
    }

    #[inline]
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.with_lock(|inner| *inner = Some(snapshot.clone()))
    }

    #[inline]
    fn clear(&self) -> Result<()> {
        self.with_lock(|inner| *inner = None)
    }
}
