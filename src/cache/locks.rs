//! Per-transaction operation serialization.
//!
//! Two mutations of the same transaction never overlap: the second one
//! waits until the first has finished its request and applied (or skipped)
//! its local change. Different ids do not contend.

use alloc::sync::Arc;
use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::lock_error;
use crate::error::Result;
use crate::models::TransactionId;

/// Registry of async locks keyed by transaction id.
///
/// Entries are created on demand and dropped again once no operation holds
/// or waits for them, so the map only ever contains in-flight ids.
#[derive(Debug, Default)]
pub(crate) struct IdLocks {
    /// Live locks.
    slots: Mutex<HashMap<TransactionId, Arc<AsyncMutex<()>>>>,
}

impl IdLocks {
    /// Waits until no other operation on `id` is running and returns a
    /// guard that keeps it that way until dropped.
    pub(crate) async fn acquire(&self, id: TransactionId) -> Result<IdGuard<'_>> {
        let slot = {
            let mut slots = self.slots.lock().map_err(|err| lock_error(&err))?;
            Arc::clone(slots.entry(id).or_default())
        };
        // The lock future drops before `pending` if this call is cancelled.
        let mut pending = Pending {
            id,
            locks: self,
            armed: true,
        };
        let guard = slot.lock_owned().await;
        pending.armed = false;
        tracing::trace!(%id, "acquired transaction lock");
        Ok(IdGuard {
            id,
            locks: self,
            guard: Some(guard),
        })
    }

    /// Drops the entry for `id` if nobody holds or waits for it.
    fn reclaim(&self, id: TransactionId) {
        // Waiters clone the slot under the registry lock, so a count of one
        // means nobody else is interested.
        if let Ok(mut slots) = self.slots.lock()
            && slots
                .get(&id)
                .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            let _removed = slots.remove(&id);
        }
    }

    /// Number of ids with a live lock.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().map_or(0, |slots| slots.len())
    }
}

/// Exclusive hold on one transaction id.
#[derive(Debug)]
pub(crate) struct IdGuard<'locks> {
    /// Locked id.
    id: TransactionId,
    /// Registry the lock came from.
    locks: &'locks IdLocks,
    /// Held lock; taken on drop so the registry entry can be reclaimed.
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.reclaim(self.id);
    }
}

/// Wait for a slot that has not been granted yet.
///
/// Reclaims the entry when the wait is abandoned, in case the holder
/// released while this waiter still kept the slot alive.
#[derive(Debug)]
struct Pending<'locks> {
    /// Awaited id.
    id: TransactionId,
    /// Registry the slot lives in.
    locks: &'locks IdLocks,
    /// Cleared once the lock is granted.
    armed: bool,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::trace!(id = %self.id, "abandoned wait for transaction lock");
            self.locks.reclaim(self.id);
        }
    }
}
