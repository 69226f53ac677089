//! JSON-file session store.
//!
//! Keeps the snapshot in a single `session.json` under a per-user cache
//! directory (default: `$XDG_CACHE_HOME/ledger-sync/`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{SessionStore, Snapshot, lock_error};
use crate::error::{LedgerError, Result};

/// Application name used for the cache directory.
const APP_NAME: &str = "ledger-sync";

/// Snapshot file name.
const SESSION_FILE: &str = "session.json";

/// File-backed session store.
///
/// Writes go to a temporary file that is then renamed over
/// `session.json`, so a crash mid-write leaves the previous snapshot
/// intact. A missing file reads as "no session".
#[derive(Debug)]
pub struct FileSession {
    /// Directory containing the snapshot.
    dir: PathBuf,
    /// Serializes in-process access.
    lock: Mutex<()>,
}

impl FileSession {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(session_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    /// Returns the default per-user cache directory for this application.
    ///
    /// On Linux: `$XDG_CACHE_HOME/ledger-sync/` (typically
    /// `~/.cache/ledger-sync/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the platform cache directory cannot be
    /// determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::cache_dir()
            .map(|cache_path| cache_path.join(APP_NAME))
            .ok_or_else(|| {
                LedgerError::Session("could not determine platform cache directory".into())
            })
    }

    /// Returns the directory the snapshot lives in.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the snapshot file path.
    fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Runs `op` while holding the in-process lock.
    fn with_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_error(&err))?;
        op()
    }
}

impl SessionStore for FileSession {
    #[inline]
    fn load(&self) -> Result<Option<Snapshot>> {
        self.with_lock(|| match fs::read_to_string(self.path()) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(LedgerError::from),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(session_io_error(err)),
        })
    }

    #[inline]
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.with_lock(|| {
            let tmp_path = self.dir.join(format!("{SESSION_FILE}.tmp"));
            let json = serde_json::to_string_pretty(snapshot)?;
            fs::write(&tmp_path, json).map_err(session_io_error)?;
            fs::rename(&tmp_path, self.path()).map_err(session_io_error)?;
            tracing::debug!(
                transactions = snapshot.transactions.len(),
                deleted = snapshot.deleted.len(),
                "session snapshot written"
            );
            Ok(())
        })
    }

    #[inline]
    fn clear(&self) -> Result<()> {
        self.with_lock(|| match fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(session_io_error(err)),
        })
    }
}

/// Wraps an I/O error into a [`LedgerError::Session`].
fn session_io_error(err: io::Error) -> LedgerError {
    LedgerError::Session(Box::new(err))
}
