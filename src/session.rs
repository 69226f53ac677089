//! Session-scoped mirror of the transaction cache.
//!
//! The cache is a disposable replica of server state. A [`SessionStore`]
//! keeps one [`Snapshot`] of it around so a restarted front end can show
//! the last view (including the undo stack) before the next fetch
//! completes. Losing the snapshot is never an error.

#[cfg(feature = "session-file")]
mod file;
mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Bank, Category, FilterCriteria, Transaction};

#[cfg(feature = "session-file")]
pub use file::FileSession;
pub use memory::InMemorySession;

/// Point-in-time copy of everything the cache holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
    /// Active list, in display order.
    pub transactions: Vec<Transaction>,
    /// Deleted stack, most recent delete last.
    #[serde(default)]
    pub deleted: Vec<Transaction>,
    /// Cached categories.
    #[serde(default)]
    pub categories: Vec<Category>,
    /// Banks the user has transactions from.
    #[serde(default)]
    pub banks: Vec<Bank>,
    /// Every bank statements can be imported from.
    #[serde(default)]
    pub available_banks: Vec<Bank>,
    /// Filter the active list was last loaded with.
    #[serde(default)]
    pub filter: Option<FilterCriteria>,
}

/// Backend holding at most one [`Snapshot`].
///
/// All methods take `&self`; implementations use interior mutability.
pub trait SessionStore: core::fmt::Debug + Send + Sync {
    /// Returns the stored snapshot, or `Ok(None)` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or holds a corrupt
    /// snapshot.
    fn load(&self) -> Result<Option<Snapshot>>;

    /// Replaces the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Drops the stored snapshot. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn clear(&self) -> Result<()>;
}

/// Wraps a mutex poison error into a [`crate::error::LedgerError::Session`].
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> crate::error::LedgerError {
    crate::error::LedgerError::Session(err.to_string().into())
}
