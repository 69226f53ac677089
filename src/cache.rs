//! Client-side transaction cache kept in step with the server.
//!
//! [`Ledger`] owns the active transaction list, the deleted-transaction
//! stack used for undo, and name-keyed category and bank indexes. Every
//! mutation goes to the server first; local state changes only after the
//! server has acknowledged, and the attached [`LedgerView`] is refreshed
//! afterwards.
//!
//! Mutations of the same transaction id are serialized, so a modify issued
//! while a delete of that id is in flight waits for the delete and then
//! finds nothing to update.

mod index;
mod locks;

use alloc::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;

use self::index::NameIndex;
use self::locks::IdLocks;
use crate::api::Api;
use crate::error::{LedgerError, Result};
use crate::models::{
    Bank, BankId, Category, CategoryDraft, CategoryId, CategoryPatch, FilterCriteria,
    MonthlySaldo, PasswordChange, StatementFile, Transaction, TransactionDraft, TransactionId,
    TransactionPatch, UploadReport, UserDetails, UserId, UserPatch,
};
use crate::session::{SessionStore, Snapshot};
use crate::view::{CategoryWeights, LedgerView, NoopView, TableRow, table_rows};

/// Transaction cache bound to a backend and a view.
///
/// All methods take `&self`, so a `Ledger` can be shared between tasks
/// (for example behind an [`alloc::sync::Arc`]).
///
/// # Example
///
/// ```rust,no_run
/// use ledger_sync::cache::Ledger;
/// use ledger_sync::client::LedgerClient;
/// use ledger_sync::models::{FilterCriteria, TransactionDraft};
/// use ledger_sync::view::NoopView;
///
/// # async fn run() -> ledger_sync::error::Result<()> {
/// let client = LedgerClient::builder().csrf_token("token").build()?;
/// let ledger = Ledger::new(client, NoopView);
/// ledger.load(FilterCriteria::new()).await?;
///
/// let id = ledger
///     .add(&TransactionDraft::new(-3.5, "EUR", "2023-05-02").title("Coffee"))
///     .await?;
/// ledger.delete(id).await?;
/// let restored = ledger.undo_delete().await?;
/// assert_ne!(restored, id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Ledger<A: Api, V: LedgerView = NoopView> {
    /// Backend every mutation is confirmed by.
    api: A,
    /// Renderer notified after each change.
    view: V,
    /// Cached state; never held across an `.await`.
    state: Mutex<Inner>,
    /// Per-transaction operation locks.
    locks: IdLocks,
}

/// Mutable cache state.
#[derive(Debug, Default)]
struct Inner {
    /// Active list in display order, newest first.
    transactions: Vec<Transaction>,
    /// Soft-deleted records, most recent delete last.
    deleted: Vec<Transaction>,
    /// The user's categories.
    categories: NameIndex<Category>,
    /// Banks the user has transactions from.
    banks: NameIndex<Bank>,
    /// Every bank statements can be imported from.
    available_banks: NameIndex<Bank>,
    /// Currencies the server converts between.
    currencies: Vec<String>,
    /// Statement currencies present among the user's transactions.
    base_currencies: Vec<String>,
    /// Currency every amount is converted into.
    main_currency: Option<String>,
    /// Signed-in user.
    user: Option<UserDetails>,
    /// Filter of the last successful load.
    filter: Option<FilterCriteria>,
    /// Categories deleted on the server during this session.
    retired_categories: BTreeSet<CategoryId>,
}

impl Inner {
    /// Returns the cached record with `id`.
    fn find_mut(&mut self, id: TransactionId) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|tx| tx.id == id)
    }

    /// Moves `id` from the active list onto the deleted stack.
    ///
    /// Returns `false` and changes nothing when `id` is not cached.
    fn soft_delete(&mut self, id: TransactionId) -> bool {
        let Some(position) = self.transactions.iter().position(|tx| tx.id == id) else {
            return false;
        };
        let record = self.transactions.remove(position);
        self.deleted.push(record);
        true
    }

    /// Clears the category of every cached record, active or deleted, that
    /// points at one of `ids`. Returns the number of records touched.
    fn clear_categories(&mut self, ids: &[CategoryId]) -> usize {
        let mut cleared = 0_usize;
        for tx in self.transactions.iter_mut().chain(self.deleted.iter_mut()) {
            if tx.category.is_some_and(|category| ids.contains(&category)) {
                tx.category = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Clears the category of `tx` if it was deleted on the server.
    fn drop_retired_category(&self, tx: &mut Transaction) {
        if tx
            .category
            .is_some_and(|category| self.retired_categories.contains(&category))
        {
            tracing::debug!(id = %tx.id, "dropping deleted category from record");
            tx.category = None;
        }
    }

    /// Returns `true` if `id` waits on the deleted stack.
    fn is_deleted(&self, id: TransactionId) -> bool {
        self.deleted.iter().any(|tx| tx.id == id)
    }

    /// Resolves a bank name from the user's banks, falling back to every
    /// known bank.
    fn bank_name(&self, id: BankId) -> Option<String> {
        self.banks
            .name_of(id)
            .or_else(|| self.available_banks.name_of(id))
    }

    /// Rows for the transaction table.
    fn table_rows(&self) -> Vec<TableRow> {
        table_rows(
            &self.transactions,
            |id| self.categories.name_of(id),
            |id| self.bank_name(id),
        )
    }

    /// Totals for the category chart.
    fn category_weights(&self) -> CategoryWeights {
        CategoryWeights::from_transactions(&self.transactions, |id| self.categories.name_of(id))
    }
}

impl<A: Api, V: LedgerView> Ledger<A, V> {
    /// Creates an empty cache.
    #[inline]
    #[must_use]
    pub fn new(api: A, view: V) -> Self {
        Self {
            api,
            view,
            state: Mutex::new(Inner::default()),
            locks: IdLocks::default(),
        }
    }

    /// Returns the backend.
    #[inline]
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Returns the attached view.
    #[inline]
    #[must_use]
    pub const fn view(&self) -> &V {
        &self.view
    }

    // ── Transactions ────────────────────────────────────────────────

    /// Loads the transactions matching `filter`, replacing the active list.
    ///
    /// The filter is remembered and reused by [`Self::reload`]. Records
    /// deleted while the request was in flight are left out. Returns the
    /// number of records loaded.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidFilter`] without sending a request if
    /// a range is inverted, or the request error. The cache is unchanged
    /// on error.
    #[tracing::instrument(skip_all)]
    pub async fn load(&self, filter: FilterCriteria) -> Result<usize> {
        filter.validate()?;
        let mut fetched = self.api.fetch_transactions(&filter).await?;
        let count = self.apply(|state| {
            fetched.retain(|tx| !state.is_deleted(tx.id));
            let loaded = fetched.len();
            state.transactions = fetched;
            state.filter = Some(filter);
            loaded
        })?;
        tracing::debug!(count, "transactions loaded");
        Ok(count)
    }

    /// Loads again with the last filter, or with no filter if nothing was
    /// loaded yet.
    ///
    /// # Errors
    ///
    /// Returns the request error; the cache is unchanged on error.
    #[inline]
    pub async fn reload(&self) -> Result<usize> {
        let filter = self
            .with_state(|state| state.filter.clone())?
            .unwrap_or_default();
        self.load(filter).await
    }

    /// Stores a new transaction and puts the server's record at the front
    /// of the active list. Returns the id the server assigned.
    ///
    /// # Errors
    ///
    /// Returns the request error; nothing is inserted on error.
    #[tracing::instrument(skip_all)]
    pub async fn add(&self, draft: &TransactionDraft) -> Result<TransactionId> {
        let record = self.api.add_transaction(draft).await?;
        let id = record.id;
        tracing::debug!(%id, "transaction added");
        self.apply(|state| state.transactions.insert(0, record))?;
        Ok(id)
    }

    /// Applies `patch` to a transaction.
    ///
    /// Only the changed fields are sent, and they are merged into the
    /// cached record once the server has acknowledged. Returns `false` if
    /// the id is not cached (the server change still happened) or the
    /// patch is empty (no request is sent).
    ///
    /// # Errors
    ///
    /// Returns the request error; the cached record is unchanged on error.
    #[tracing::instrument(skip_all, fields(%id))]
    pub async fn modify(&self, id: TransactionId, patch: &TransactionPatch) -> Result<bool> {
        if patch.is_empty() {
            tracing::debug!("empty patch, nothing to send");
            return Ok(false);
        }
        let _guard = self.locks.acquire(id).await?;
        let stored = self.api.modify_transaction(id, patch).await?;
        let merged = self.apply(|state| {
            state.find_mut(id).map(|tx| {
                patch.apply_to(tx);
                tx.clone()
            })
        })?;
        match merged.as_ref() {
            Some(local) if disagrees(local, &stored) => {
                tracing::warn!("server record differs from the merged cache entry");
            }
            Some(_) => tracing::debug!("transaction modified"),
            None => tracing::debug!("modified transaction is not cached"),
        }
        Ok(merged.is_some())
    }

    /// Deletes a transaction and moves the cached record onto the deleted
    /// stack, keeping every field for a later undo.
    ///
    /// Returns `false` when the server deleted a record that was not
    /// cached; the active list is left as it was.
    ///
    /// # Errors
    ///
    /// Returns the request error; the active list is unchanged on error.
    #[tracing::instrument(skip_all, fields(%id))]
    pub async fn delete(&self, id: TransactionId) -> Result<bool> {
        let _guard = self.locks.acquire(id).await?;
        self.api.delete_transaction(id).await?;
        let moved = self.apply(|state| state.soft_delete(id))?;
        if moved {
            tracing::debug!("transaction moved to the deleted stack");
        } else {
            tracing::debug!("deleted transaction is not cached");
        }
        Ok(moved)
    }

    /// Re-adds the most recently deleted transaction.
    ///
    /// The server assigns a new id; the view is told to re-key anything it
    /// rendered for the old one. A category deleted while the request was
    /// in flight is cleared from the restored record. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NothingToUndo`] if the deleted stack is
    /// empty, or the request error, in which case the record goes back onto
    /// the stack.
    #[tracing::instrument(skip_all)]
    pub async fn undo_delete(&self) -> Result<TransactionId> {
        let mut record = self
            .with_state(|state| state.deleted.pop())?
            .ok_or(LedgerError::NothingToUndo)?;
        let old = record.id;
        match self.api.add_transaction(&record.to_draft()).await {
            Ok(mut restored) => {
                let new = restored.id;
                self.apply(|state| {
                    state.drop_retired_category(&mut restored);
                    state.transactions.insert(0, restored);
                })?;
                tracing::debug!(%old, %new, "deleted transaction restored");
                self.view.rekey_row(old, new);
                Ok(new)
            }
            Err(err) => {
                self.with_state(|state| {
                    state.drop_retired_category(&mut record);
                    state.deleted.push(record);
                })?;
                Err(err)
            }
        }
    }

    /// Deletes every transaction of `user` on the server and empties the
    /// active list. Returns how many records the server removed.
    ///
    /// # Errors
    ///
    /// Returns the request error; the cache is unchanged on error.
    #[tracing::instrument(skip_all, fields(%user))]
    pub async fn delete_all_transactions(&self, user: UserId) -> Result<u64> {
        let count = self.api.delete_all_transactions(user).await?;
        tracing::debug!(count = count.number_of_deleted, "all transactions deleted");
        self.apply(|state| state.transactions.clear())?;
        Ok(count.number_of_deleted)
    }

    /// Uploads statement files and reloads the active list with the last
    /// filter if anything was imported.
    ///
    /// Partial and total import failures are reported through the returned
    /// [`UploadReport`], not as errors.
    ///
    /// # Errors
    ///
    /// Returns the request error for undocumented statuses, or the reload
    /// error.
    #[tracing::instrument(skip_all, fields(files = files.len()))]
    pub async fn upload_statements(&self, files: Vec<StatementFile>) -> Result<UploadReport> {
        let report = self.api.upload_statements(files).await?;
        tracing::debug!(
            status = report.status.status_code(),
            imported = report.outcome.amount,
            failed = report.outcome.failed.len(),
            "statements uploaded"
        );
        if report.status.imported_any() {
            let _count = self.reload().await?;
        }
        Ok(report)
    }

    /// Fetches month-by-month cash flow and hands it to the cash-flow chart.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[tracing::instrument(skip_all, fields(%user))]
    pub async fn monthly_summary(&self, user: UserId) -> Result<Vec<MonthlySaldo>> {
        let months = self.api.monthly_summary(user).await?;
        tracing::debug!(months = months.len(), "monthly summary loaded");
        self.view.refresh_cash_flow(&months);
        Ok(months)
    }

    // ── Reference data ──────────────────────────────────────────────

    /// Loads the user's and the application's reference data and rebuilds
    /// the category and bank indexes.
    ///
    /// # Errors
    ///
    /// Returns the first request error; the cache is unchanged on error.
    #[tracing::instrument(skip_all)]
    pub async fn load_entities(&self) -> Result<()> {
        let user = self.api.user_entities().await?;
        let session = self.api.session_entities().await?;
        tracing::debug!(
            categories = user.categories.len(),
            banks = user.banks.len(),
            available_banks = session.banks.len(),
            "reference data loaded"
        );
        self.apply(|state| {
            state.categories = NameIndex::from_entities(user.categories.into_values());
            state.banks = NameIndex::from_entities(user.banks.into_values());
            state.available_banks = NameIndex::from_entities(session.banks.into_values());
            state.currencies = session.currencies;
            state.base_currencies = user.base_currencies;
            state.main_currency = Some(user.main_currency);
            state.user = Some(user.user_details);
        })?;
        self.refresh_reference_lists()
    }

    /// Creates a category and adds it to the index.
    ///
    /// # Errors
    ///
    /// Returns the request error; the index is unchanged on error.
    #[tracing::instrument(skip_all)]
    pub async fn add_category(&self, draft: &CategoryDraft) -> Result<Category> {
        let category = self.api.add_category(draft).await?;
        tracing::debug!(id = %category.id, "category added");
        self.with_state(|state| state.categories.insert(category.clone()))?;
        self.refresh_reference_lists()?;
        Ok(category)
    }

    /// Modifies a category. A rename replaces the old name key with the new
    /// one; both are never present together.
    ///
    /// # Errors
    ///
    /// Returns the request error; the index is unchanged on error.
    #[tracing::instrument(skip_all, fields(%id))]
    pub async fn modify_category(&self, id: CategoryId, patch: &CategoryPatch) -> Result<Category> {
        let category = self.api.modify_category(id, patch).await?;
        if category.id != id {
            tracing::warn!(returned = %category.id, "server returned a different category");
        }
        self.apply(|state| state.categories.insert(category.clone()))?;
        self.refresh_reference_lists()?;
        Ok(category)
    }

    /// Deletes a batch of categories.
    ///
    /// Every cached transaction that referenced one of them, including the
    /// ones waiting on the deleted stack, ends up with no category. An
    /// empty batch sends no request. Returns the records the server
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns the request error; nothing is cleared on error.
    #[tracing::instrument(skip_all, fields(count = ids.len()))]
    pub async fn delete_categories(&self, ids: &[CategoryId]) -> Result<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let deleted = self.api.delete_categories(ids).await?;
        let cleared = self.apply(|state| {
            for &id in ids {
                let _removed = state.categories.remove_id(id);
                let _new = state.retired_categories.insert(id);
            }
            for category in &deleted {
                let _removed = state.categories.remove_id(category.id);
                let _new = state.retired_categories.insert(category.id);
            }
            state.clear_categories(ids)
        })?;
        tracing::debug!(cleared, "categories deleted");
        self.refresh_reference_lists()?;
        Ok(deleted)
    }

    // ── Account ─────────────────────────────────────────────────────

    /// Changes profile fields of `user` and updates the cached account.
    ///
    /// A new main currency makes every cached amount stale, so the active
    /// list is reloaded with the last filter afterwards.
    ///
    /// # Errors
    ///
    /// Returns the request error, in which case the cached account is
    /// unchanged, or the reload error.
    #[tracing::instrument(skip_all, fields(%user))]
    pub async fn modify_user(&self, user: UserId, patch: &UserPatch) -> Result<UserDetails> {
        let record = self.api.modify_user(user, patch).await?;
        let currency_changed = self.with_state(|state| {
            let changed = state.main_currency.as_deref() != Some(record.main_currency.as_str());
            state.main_currency = Some(record.main_currency.clone());
            state.user = Some(record.details.clone());
            changed
        })?;
        if currency_changed && patch.main_currency.is_some() {
            tracing::debug!(currency = %record.main_currency, "main currency changed");
            let _count = self.reload().await?;
        }
        Ok(record.details)
    }

    /// Replaces the password of `user`.
    ///
    /// # Errors
    ///
    /// Returns the request error; a wrong current password comes back as
    /// [`LedgerError::Api`] with status 403.
    #[tracing::instrument(skip_all, fields(%user))]
    pub async fn change_password(&self, user: UserId, change: &PasswordChange) -> Result<()> {
        self.api.change_password(user, change).await?;
        tracing::debug!("password changed");
        Ok(())
    }

    /// Deletes the account of `user` and empties the whole cache,
    /// including the deleted stack.
    ///
    /// # Errors
    ///
    /// Returns the request error; the cache is unchanged on error.
    #[tracing::instrument(skip_all, fields(%user))]
    pub async fn delete_user(&self, user: UserId) -> Result<()> {
        self.api.delete_user(user).await?;
        tracing::debug!("account deleted");
        self.apply(|state| *state = Inner::default())?;
        self.refresh_reference_lists()
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Returns the active list, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn transactions(&self) -> Result<Vec<Transaction>> {
        self.with_state(|state| state.transactions.clone())
    }

    /// Returns the cached record with `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        self.with_state(|state| state.transactions.iter().find(|tx| tx.id == id).cloned())
    }

    /// Returns the deleted stack, most recent delete last.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn deleted(&self) -> Result<Vec<Transaction>> {
        self.with_state(|state| state.deleted.clone())
    }

    /// Evaluates `filter` against the active list without a request.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidFilter`] if a range is inverted.
    #[inline]
    pub fn filtered(&self, filter: &FilterCriteria) -> Result<Vec<Transaction>> {
        filter.validate()?;
        self.with_state(|state| {
            state
                .transactions
                .iter()
                .filter(|tx| filter.matches(tx))
                .cloned()
                .collect()
        })
    }

    /// Returns the table rows currently shown.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn table(&self) -> Result<Vec<TableRow>> {
        self.with_state(|state| state.table_rows())
    }

    /// Returns the category chart totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn category_weights(&self) -> Result<CategoryWeights> {
        self.with_state(|state| state.category_weights())
    }

    /// Returns the cached categories ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn categories(&self) -> Result<Vec<Category>> {
        self.with_state(|state| state.categories.to_vec())
    }

    /// Looks a category up by its display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn category_by_name(&self, name: &str) -> Result<Option<Category>> {
        self.with_state(|state| state.categories.get(name).cloned())
    }

    /// Returns the banks the user has transactions from.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn banks(&self) -> Result<Vec<Bank>> {
        self.with_state(|state| state.banks.to_vec())
    }

    /// Returns every bank statements can be imported from.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn available_banks(&self) -> Result<Vec<Bank>> {
        self.with_state(|state| state.available_banks.to_vec())
    }

    /// Looks a bank up by display name among all known banks.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn bank_by_name(&self, name: &str) -> Result<Option<Bank>> {
        self.with_state(|state| {
            state
                .banks
                .get(name)
                .or_else(|| state.available_banks.get(name))
                .cloned()
        })
    }

    /// Returns the currencies the server converts between.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn currencies(&self) -> Result<Vec<String>> {
        self.with_state(|state| state.currencies.clone())
    }

    /// Returns the statement currencies present among the user's records.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn base_currencies(&self) -> Result<Vec<String>> {
        self.with_state(|state| state.base_currencies.clone())
    }

    /// Returns the user's main currency, once reference data is loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn main_currency(&self) -> Result<Option<String>> {
        self.with_state(|state| state.main_currency.clone())
    }

    /// Returns the signed-in user, once reference data is loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn user(&self) -> Result<Option<UserDetails>> {
        self.with_state(|state| state.user.clone())
    }

    /// Returns the filter of the last successful load.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn last_filter(&self) -> Result<Option<FilterCriteria>> {
        self.with_state(|state| state.filter.clone())
    }

    // ── Session mirror ──────────────────────────────────────────────

    /// Captures the whole cache state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn snapshot(&self) -> Result<Snapshot> {
        self.with_state(|state| Snapshot {
            saved_at: Utc::now(),
            transactions: state.transactions.clone(),
            deleted: state.deleted.clone(),
            categories: state.categories.to_vec(),
            banks: state.banks.to_vec(),
            available_banks: state.available_banks.to_vec(),
            filter: state.filter.clone(),
        })
    }

    /// Replaces the cache state with `snapshot` and redraws every view.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn restore(&self, snapshot: Snapshot) -> Result<()> {
        tracing::debug!(
            saved_at = %snapshot.saved_at,
            transactions = snapshot.transactions.len(),
            deleted = snapshot.deleted.len(),
            "restoring cache snapshot"
        );
        self.apply(|state| {
            state.transactions = snapshot.transactions;
            state.deleted = snapshot.deleted;
            state.categories = NameIndex::from_entities(snapshot.categories);
            state.banks = NameIndex::from_entities(snapshot.banks);
            state.available_banks = NameIndex::from_entities(snapshot.available_banks);
            state.filter = snapshot.filter;
        })?;
        self.refresh_reference_lists()
    }

    /// Writes a snapshot to `store`.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    #[inline]
    pub fn persist<S: SessionStore + ?Sized>(&self, store: &S) -> Result<()> {
        store.save(&self.snapshot()?)
    }

    /// Restores the snapshot held by `store`, if any. Returns whether one
    /// was found.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    #[inline]
    pub fn resume<S: SessionStore + ?Sized>(&self, store: &S) -> Result<bool> {
        match store.load()? {
            Some(snapshot) => {
                self.restore(snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops every record on the deleted stack; they can no longer be
    /// undone. Returns how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    #[inline]
    pub fn discard_deleted(&self) -> Result<usize> {
        self.with_state(|state| {
            let count = state.deleted.len();
            state.deleted.clear();
            count
        })
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Runs `op` on the locked state.
    fn with_state<R, F: FnOnce(&mut Inner) -> R>(&self, op: F) -> Result<R> {
        let mut state = self.state.lock().map_err(|err| lock_error(&err))?;
        Ok(op(&mut state))
    }

    /// Runs `op` on the locked state, then redraws the table and the
    /// category chart with the lock released.
    fn apply<R, F: FnOnce(&mut Inner) -> R>(&self, op: F) -> Result<R> {
        let (result, rows, weights) = self.with_state(|state| {
            let result = op(state);
            (result, state.table_rows(), state.category_weights())
        })?;
        self.view.refresh_table(&rows);
        self.view.refresh_category_chart(&weights);
        Ok(result)
    }

    /// Redraws category and bank dropdowns.
    fn refresh_reference_lists(&self) -> Result<()> {
        let (categories, banks) =
            self.with_state(|state| (state.categories.to_vec(), state.banks.to_vec()))?;
        self.view.refresh_reference_lists(&categories, &banks);
        Ok(())
    }
}

/// Returns `true` if the server's copy of a modified record differs from
/// the merged cache entry in a field the client can edit.
fn disagrees(local: &Transaction, stored: &Transaction) -> bool {
    local.id != stored.id
        || local.info != stored.info
        || local.title != stored.title
        || local.place != stored.place
        || local.category != stored.category
        || local.bank != stored.bank
}

/// Wraps a mutex poison error into a [`LedgerError::Session`].
fn lock_error<T>(err: &PoisonError<T>) -> LedgerError {
    LedgerError::Session(err.to_string().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DeletedCount, SessionEntities, UploadOutcome, UploadStatus, UserEntities, UserRecord,
    };
    use crate::session::InMemorySession;
    use alloc::collections::BTreeMap;
    use core::time::Duration;

    // ── Test doubles ────────────────────────────────────────────────

    /// In-memory backend with a failure switch.
    #[derive(Debug, Default)]
    struct MockApi {
        /// Mutable mock state.
        inner: Mutex<MockState>,
    }

    /// State behind [`MockApi`].
    #[derive(Debug, Default)]
    struct MockState {
        /// Next id handed out by `add_transaction`.
        next_id: i64,
        /// When set, every request fails with a 500.
        fail: bool,
        /// Delay applied to `delete_transaction`.
        delete_delay: Option<Duration>,
        /// Delay applied to `fetch_transactions`.
        fetch_delay: Option<Duration>,
        /// Delay applied to `add_transaction`.
        add_delay: Option<Duration>,
        /// When set, only `add_transaction` fails.
        fail_add: bool,
        /// Records returned by `fetch_transactions`.
        server_list: Vec<Transaction>,
        /// Status returned by `upload_statements`.
        upload_status: Option<UploadStatus>,
        /// Request log, in arrival order.
        calls: Vec<String>,
        /// Last draft received by `add_transaction`.
        last_draft: Option<TransactionDraft>,
    }

    impl MockApi {
        fn details(user: UserId) -> UserDetails {
            UserDetails {
                id: user,
                username: "jane".to_owned(),
                email: "jane@example.com".to_owned(),
                first_name: None,
                last_name: None,
            }
        }

        fn starting_at(next_id: i64) -> Self {
            let api = Self::default();
            api.inner.lock().unwrap().next_id = next_id;
            api
        }

        fn set_fail(&self, fail: bool) {
            self.inner.lock().unwrap().fail = fail;
        }

        fn calls(&self) -> Vec<String> {
            self.inner.lock().unwrap().calls.clone()
        }

        /// Logs a call and fails if the switch is on.
        fn enter(&self, call: String) -> Result<()> {
            let mut state = self.inner.lock().unwrap();
            state.calls.push(call);
            if state.fail {
                return Err(LedgerError::Api {
                    status: 500,
                    message: "Internal Server Error".to_owned(),
                });
            }
            Ok(())
        }
    }

    impl Api for MockApi {
        async fn fetch_transactions(&self, _filter: &FilterCriteria) -> Result<Vec<Transaction>> {
            let delay = self.inner.lock().unwrap().fetch_delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.enter("fetch".to_owned())?;
            Ok(self.inner.lock().unwrap().server_list.clone())
        }

        async fn add_transaction(&self, draft: &TransactionDraft) -> Result<Transaction> {
            let delay = self.inner.lock().unwrap().add_delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.enter("add".to_owned())?;
            let mut state = self.inner.lock().unwrap();
            if state.fail_add {
                return Err(LedgerError::Api {
                    status: 400,
                    message: "Bad Request".to_owned(),
                });
            }
            let id = state.next_id;
            state.next_id += 1;
            state.last_draft = Some(draft.clone());
            Ok(Transaction {
                id: TransactionId::new(id),
                info: draft.info.clone(),
                title: draft.title.clone(),
                amount: Some(draft.amount.unwrap_or(draft.base_amount)),
                base_amount: draft.base_amount,
                base_currency: draft.base_currency.clone(),
                category: draft.category,
                date: draft.date.clone(),
                place: draft.place.clone(),
                bank: draft.bank,
                creation_date: Some("2023-05-03T10:00:00".to_owned()),
            })
        }

        async fn modify_transaction(
            &self,
            id: TransactionId,
            patch: &TransactionPatch,
        ) -> Result<Transaction> {
            self.enter(format!("modify {id}"))?;
            let mut record = coffee(id.into_inner());
            patch.apply_to(&mut record);
            Ok(record)
        }

        async fn delete_transaction(&self, id: TransactionId) -> Result<()> {
            let delay = self.inner.lock().unwrap().delete_delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.enter(format!("delete {id}"))
        }

        async fn delete_all_transactions(&self, user: UserId) -> Result<DeletedCount> {
            self.enter(format!("wipe {user}"))?;
            Ok(DeletedCount {
                number_of_deleted: 3,
            })
        }

        async fn add_category(&self, draft: &CategoryDraft) -> Result<Category> {
            self.enter("add category".to_owned())?;
            Ok(category(9, &draft.name))
        }

        async fn modify_category(&self, id: CategoryId, patch: &CategoryPatch) -> Result<Category> {
            self.enter(format!("modify category {id}"))?;
            Ok(category(id.into_inner(), patch.name.as_deref().unwrap_or("")))
        }

        async fn delete_categories(&self, ids: &[CategoryId]) -> Result<Vec<Category>> {
            self.enter("delete categories".to_owned())?;
            Ok(ids.iter().map(|id| category(id.into_inner(), "gone")).collect())
        }

        async fn user_entities(&self) -> Result<UserEntities> {
            self.enter("user entities".to_owned())?;
            Ok(UserEntities {
                user_details: UserDetails {
                    id: UserId::new(1),
                    username: "jane".to_owned(),
                    email: "jane@example.com".to_owned(),
                    first_name: None,
                    last_name: None,
                },
                main_currency: "CZK".to_owned(),
                base_currencies: vec!["CZK".to_owned(), "EUR".to_owned()],
                banks: BTreeMap::from([("Revolut".to_owned(), bank(2, "Revolut"))]),
                categories: BTreeMap::from([
                    ("A".to_owned(), category(1, "A")),
                    ("B".to_owned(), category(2, "B")),
                ]),
            })
        }

        async fn session_entities(&self) -> Result<SessionEntities> {
            self.enter("session entities".to_owned())?;
            Ok(SessionEntities {
                currencies: vec!["CZK".to_owned(), "EUR".to_owned(), "USD".to_owned()],
                banks: BTreeMap::from([
                    ("Revolut".to_owned(), bank(2, "Revolut")),
                    ("Equabank".to_owned(), bank(3, "Equabank")),
                ]),
            })
        }

        async fn monthly_summary(&self, user: UserId) -> Result<Vec<MonthlySaldo>> {
            self.enter(format!("monthly {user}"))?;
            Ok(vec![MonthlySaldo {
                month: "2023-05".to_owned(),
                incoming: 100.0,
                outgoing: -40.0,
                balance: 60.0,
            }])
        }

        async fn upload_statements(&self, files: Vec<StatementFile>) -> Result<UploadReport> {
            self.enter(format!("upload {}", files.len()))?;
            let status = self
                .inner
                .lock()
                .unwrap()
                .upload_status
                .unwrap_or(UploadStatus::Complete);
            Ok(UploadReport {
                status,
                outcome: UploadOutcome {
                    amount: if status.imported_any() { 2 } else { 0 },
                    ..UploadOutcome::default()
                },
            })
        }

        async fn modify_user(&self, user: UserId, patch: &UserPatch) -> Result<UserRecord> {
            self.enter(format!("modify user {user}"))?;
            let mut details = Self::details(user);
            if let Some(username) = patch.username.as_ref() {
                details.username.clone_from(username);
            }
            Ok(UserRecord {
                details,
                main_currency: patch.main_currency.clone().unwrap_or_else(|| "CZK".to_owned()),
            })
        }

        async fn change_password(&self, user: UserId, _change: &PasswordChange) -> Result<()> {
            self.enter(format!("change password {user}"))
        }

        async fn delete_user(&self, user: UserId) -> Result<()> {
            self.enter(format!("delete user {user}"))
        }
    }

    /// View that records every notification.
    #[derive(Debug, Default)]
    struct RecordingView {
        /// Recorded notifications.
        inner: Mutex<Recorded>,
    }

    /// Notifications seen by [`RecordingView`].
    #[derive(Debug, Default)]
    struct Recorded {
        /// Number of table redraws.
        table_refreshes: usize,
        /// Rows of the last table redraw.
        last_rows: Vec<TableRow>,
        /// Last category chart.
        last_weights: CategoryWeights,
        /// Re-key notifications.
        rekeys: Vec<(TransactionId, TransactionId)>,
        /// Last cash-flow chart.
        cash_flow: Vec<MonthlySaldo>,
        /// Category names of the last dropdown redraw.
        category_names: Vec<String>,
    }

    impl LedgerView for RecordingView {
        fn refresh_table(&self, rows: &[TableRow]) {
            let mut inner = self.inner.lock().unwrap();
            inner.table_refreshes += 1;
            inner.last_rows = rows.to_vec();
        }

        fn refresh_category_chart(&self, weights: &CategoryWeights) {
            self.inner.lock().unwrap().last_weights = weights.clone();
        }

        fn refresh_cash_flow(&self, months: &[MonthlySaldo]) {
            self.inner.lock().unwrap().cash_flow = months.to_vec();
        }

        fn rekey_row(&self, old: TransactionId, new: TransactionId) {
            self.inner.lock().unwrap().rekeys.push((old, new));
        }

        fn refresh_reference_lists(&self, categories: &[Category], _banks: &[Bank]) {
            self.inner.lock().unwrap().category_names =
                categories.iter().map(|c| c.name.clone()).collect();
        }
    }

    // ── Fixtures ────────────────────────────────────────────────────

    fn category(id: i64, name: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_owned(),
        }
    }

    fn bank(id: i64, name: &str) -> Bank {
        Bank {
            id: BankId::new(id),
            name: name.to_owned(),
        }
    }

    fn coffee(id: i64) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            info: Some("Cafe Louvre".to_owned()),
            title: Some("Coffee".to_owned()),
            amount: Some(-3.5),
            base_amount: -3.5,
            base_currency: "EUR".to_owned(),
            category: Some(CategoryId::new(1)),
            date: "2023-05-02".to_owned(),
            place: Some("Prague".to_owned()),
            bank: Some(BankId::new(2)),
            creation_date: Some("2023-05-03T10:00:00".to_owned()),
        }
    }

    fn with_category(id: i64, category: i64) -> Transaction {
        Transaction {
            category: Some(CategoryId::new(category)),
            ..coffee(id)
        }
    }

    fn ledger(next_id: i64) -> Ledger<MockApi, RecordingView> {
        Ledger::new(MockApi::starting_at(next_id), RecordingView::default())
    }

    fn coffee_draft() -> TransactionDraft {
        TransactionDraft::new(-3.5, "EUR", "2023-05-02").title("Coffee")
    }

    fn seed(ledger: &Ledger<MockApi, RecordingView>, records: Vec<Transaction>) {
        ledger.state.lock().unwrap().transactions = records;
    }

    // ── Add / delete / undo ─────────────────────────────────────────

    #[tokio::test]
    async fn add_delete_undo_scenario() {
        let ledger = ledger(42);

        let id = ledger.add(&coffee_draft()).await.unwrap();
        assert_eq!(id, TransactionId::new(42));
        assert_eq!(ledger.transactions().unwrap()[0].id, id);

        assert!(ledger.delete(id).await.unwrap());
        assert!(ledger.transactions().unwrap().is_empty());
        let deleted = ledger.deleted().unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].title.as_deref(), Some("Coffee"));

        let new_id = ledger.undo_delete().await.unwrap();
        assert_eq!(new_id, TransactionId::new(43));
        assert_ne!(new_id, id);
        assert!(ledger.deleted().unwrap().is_empty());

        let active = ledger.transactions().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, new_id);
        assert_eq!(active[0].title.as_deref(), Some("Coffee"));

        let recorded = ledger.view().inner.lock().unwrap();
        assert_eq!(recorded.rekeys, vec![(id, new_id)]);
        assert_eq!(recorded.last_rows.len(), 1);
        assert_eq!(recorded.last_rows[0].id, new_id);
    }

    #[tokio::test]
    async fn add_inserts_at_front() {
        let ledger = ledger(10);
        seed(&ledger, vec![coffee(1), coffee(2)]);
        let id = ledger.add(&coffee_draft()).await.unwrap();
        let ids: Vec<TransactionId> = ledger
            .transactions()
            .unwrap()
            .iter()
            .map(|tx| tx.id)
            .collect();
        assert_eq!(ids, vec![id, TransactionId::new(1), TransactionId::new(2)]);
    }

    #[tokio::test]
    async fn failed_add_inserts_nothing() {
        let ledger = ledger(1);
        ledger.api().set_fail(true);
        let err = ledger.add(&coffee_draft()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Api { status: 500, .. }));
        assert!(ledger.transactions().unwrap().is_empty());
        assert_eq!(ledger.view().inner.lock().unwrap().table_refreshes, 0);
    }

    #[tokio::test]
    async fn failed_delete_leaves_list_untouched() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(1), coffee(2)]);
        ledger.api().set_fail(true);
        assert!(ledger.delete(TransactionId::new(1)).await.is_err());
        assert_eq!(ledger.transactions().unwrap(), vec![coffee(1), coffee(2)]);
        assert!(ledger.deleted().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_of_uncached_id_is_a_no_op() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(1), coffee(2)]);
        let moved = ledger.delete(TransactionId::new(99)).await.unwrap();
        assert!(!moved);
        assert_eq!(ledger.transactions().unwrap(), vec![coffee(1), coffee(2)]);
        assert!(ledger.deleted().unwrap().is_empty());
        assert_eq!(ledger.api().calls(), vec!["delete 99"]);
    }

    #[tokio::test]
    async fn deleted_stack_is_last_in_first_out() {
        let ledger = ledger(100);
        seed(&ledger, vec![coffee(1), with_category(2, 2)]);
        let _moved = ledger.delete(TransactionId::new(1)).await.unwrap();
        let _moved = ledger.delete(TransactionId::new(2)).await.unwrap();

        let _restored = ledger.undo_delete().await.unwrap();
        let draft = ledger.api().inner.lock().unwrap().last_draft.clone().unwrap();
        assert_eq!(draft.category, Some(CategoryId::new(2)));
        assert_eq!(ledger.deleted().unwrap()[0].id, TransactionId::new(1));
    }

    #[tokio::test]
    async fn undo_with_empty_stack() {
        let ledger = ledger(1);
        let err = ledger.undo_delete().await.unwrap_err();
        assert!(matches!(err, LedgerError::NothingToUndo));
        assert!(ledger.api().calls().is_empty());
    }

    #[tokio::test]
    async fn failed_undo_keeps_record_on_stack() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(5)]);
        let _moved = ledger.delete(TransactionId::new(5)).await.unwrap();

        ledger.api().set_fail(true);
        assert!(ledger.undo_delete().await.is_err());
        assert_eq!(ledger.deleted().unwrap(), vec![coffee(5)]);
        assert!(ledger.transactions().unwrap().is_empty());
        assert!(ledger.view().inner.lock().unwrap().rekeys.is_empty());
    }

    // ── Modify ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn clearing_category_leaves_other_fields() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(7)]);
        let patch = TransactionPatch::new().category(None);
        assert!(ledger.modify(TransactionId::new(7), &patch).await.unwrap());

        let tx = ledger.transaction(TransactionId::new(7)).unwrap().unwrap();
        assert!(tx.category.is_none());
        assert_eq!(
            Transaction {
                category: Some(CategoryId::new(1)),
                ..tx
            },
            coffee(7)
        );
    }

    #[tokio::test]
    async fn modify_keeps_merged_entry_when_server_disagrees() {
        let ledger = ledger(1);
        let local = Transaction {
            info: Some("Espresso".to_owned()),
            ..coffee(7)
        };
        seed(&ledger, vec![local]);
        let patch = TransactionPatch::new().title("Lunch");
        assert!(ledger.modify(TransactionId::new(7), &patch).await.unwrap());

        let tx = ledger.transaction(TransactionId::new(7)).unwrap().unwrap();
        assert_eq!(tx.title.as_deref(), Some("Lunch"));
        assert_eq!(tx.info.as_deref(), Some("Espresso"));
        assert_eq!(ledger.table().unwrap()[0].title, "Lunch");
    }

    #[tokio::test]
    async fn failed_modify_applies_nothing() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(7)]);
        ledger.api().set_fail(true);
        let patch = TransactionPatch::new().title("Lunch");
        assert!(ledger.modify(TransactionId::new(7), &patch).await.is_err());
        assert_eq!(ledger.transactions().unwrap(), vec![coffee(7)]);
    }

    #[tokio::test]
    async fn modify_of_uncached_id_is_silent() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(7)]);
        let patch = TransactionPatch::new().title("Lunch");
        assert!(!ledger.modify(TransactionId::new(8), &patch).await.unwrap());
        assert_eq!(ledger.transactions().unwrap(), vec![coffee(7)]);
    }

    #[tokio::test]
    async fn empty_patch_sends_nothing() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(7)]);
        let changed = ledger
            .modify(TransactionId::new(7), &TransactionPatch::new())
            .await
            .unwrap();
        assert!(!changed);
        assert!(ledger.api().calls().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn same_id_delete_and_modify_are_serialized() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(1)]);
        ledger.api().inner.lock().unwrap().delete_delay = Some(Duration::from_millis(100));

        let id = TransactionId::new(1);
        let patch = TransactionPatch::new().title("Lunch");
        let (deleted, modified) = tokio::join!(ledger.delete(id), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ledger.modify(id, &patch).await
        });

        assert!(deleted.unwrap());
        assert!(!modified.unwrap());
        assert_eq!(ledger.api().calls(), vec!["delete 1", "modify 1"]);
        assert_eq!(ledger.deleted().unwrap(), vec![coffee(1)]);
        assert!(ledger.transactions().unwrap().is_empty());
    }

    // ── Categories ──────────────────────────────────────────────────

    #[tokio::test]
    async fn batch_category_delete_clears_references() {
        let ledger = ledger(1);
        ledger.load_entities().await.unwrap();
        seed(&ledger, vec![with_category(1, 1), with_category(2, 2)]);

        let deleted = ledger.delete_categories(&[CategoryId::new(1)]).await.unwrap();
        assert_eq!(deleted.len(), 1);

        let active = ledger.transactions().unwrap();
        assert!(active[0].category.is_none());
        assert_eq!(active[1].category, Some(CategoryId::new(2)));
        assert_eq!(ledger.categories().unwrap(), vec![category(2, "B")]);
        assert_eq!(
            ledger.view().inner.lock().unwrap().category_names,
            vec!["B"]
        );
    }

    #[tokio::test]
    async fn batch_category_delete_reaches_deleted_stack() {
        let ledger = ledger(50);
        seed(&ledger, vec![with_category(1, 1)]);
        let _moved = ledger.delete(TransactionId::new(1)).await.unwrap();

        let _deleted = ledger.delete_categories(&[CategoryId::new(1)]).await.unwrap();
        assert!(ledger.deleted().unwrap()[0].category.is_none());

        let _restored = ledger.undo_delete().await.unwrap();
        let draft = ledger.api().inner.lock().unwrap().last_draft.clone().unwrap();
        assert!(draft.category.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn category_deleted_during_undo_is_cleared() {
        let ledger = ledger(50);
        ledger.load_entities().await.unwrap();
        seed(&ledger, vec![with_category(1, 1)]);
        let _moved = ledger.delete(TransactionId::new(1)).await.unwrap();
        ledger.api().inner.lock().unwrap().add_delay = Some(Duration::from_millis(100));

        let (restored, deleted) = tokio::join!(ledger.undo_delete(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ledger.delete_categories(&[CategoryId::new(1)]).await
        });

        assert_eq!(restored.unwrap(), TransactionId::new(50));
        assert_eq!(deleted.unwrap().len(), 1);
        let active = ledger.transactions().unwrap();
        assert_eq!(active.len(), 1);
        assert!(active[0].category.is_none());
        assert_eq!(ledger.categories().unwrap(), vec![category(2, "B")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_undo_drops_category_deleted_meanwhile() {
        let ledger = ledger(50);
        seed(&ledger, vec![with_category(1, 1)]);
        let _moved = ledger.delete(TransactionId::new(1)).await.unwrap();
        {
            let mut mock = ledger.api().inner.lock().unwrap();
            mock.add_delay = Some(Duration::from_millis(100));
            mock.fail_add = true;
        }

        let (restored, deleted) = tokio::join!(ledger.undo_delete(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ledger.delete_categories(&[CategoryId::new(1)]).await
        });

        assert!(restored.is_err());
        assert!(deleted.is_ok());
        let stack = ledger.deleted().unwrap();
        assert_eq!(stack.len(), 1);
        assert!(stack[0].category.is_none());

        {
            let mut mock = ledger.api().inner.lock().unwrap();
            mock.add_delay = None;
            mock.fail_add = false;
        }
        let _restored = ledger.undo_delete().await.unwrap();
        let draft = ledger.api().inner.lock().unwrap().last_draft.clone().unwrap();
        assert!(draft.category.is_none());
    }

    #[tokio::test]
    async fn empty_category_batch_sends_nothing() {
        let ledger = ledger(1);
        assert!(ledger.delete_categories(&[]).await.unwrap().is_empty());
        assert!(ledger.api().calls().is_empty());
    }

    #[tokio::test]
    async fn rename_keeps_one_entry() {
        let ledger = ledger(1);
        ledger.load_entities().await.unwrap();
        seed(&ledger, vec![with_category(1, 1)]);

        let renamed = ledger
            .modify_category(CategoryId::new(1), &CategoryPatch::rename("Groceries"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Groceries");

        let categories = ledger.categories().unwrap();
        assert_eq!(categories.iter().filter(|c| c.id == CategoryId::new(1)).count(), 1);
        assert!(ledger.category_by_name("A").unwrap().is_none());
        assert!(ledger.category_by_name("Groceries").unwrap().is_some());
        assert_eq!(ledger.table().unwrap()[0].category, "Groceries");
    }

    #[tokio::test]
    async fn failed_rename_keeps_old_name() {
        let ledger = ledger(1);
        ledger.load_entities().await.unwrap();
        ledger.api().set_fail(true);
        assert!(
            ledger
                .modify_category(CategoryId::new(1), &CategoryPatch::rename("Groceries"))
                .await
                .is_err()
        );
        assert!(ledger.category_by_name("A").unwrap().is_some());
    }

    #[tokio::test]
    async fn add_category_updates_dropdowns() {
        let ledger = ledger(1);
        let created = ledger.add_category(&CategoryDraft::new("Travel")).await.unwrap();
        assert_eq!(created.id, CategoryId::new(9));
        assert_eq!(
            ledger.view().inner.lock().unwrap().category_names,
            vec!["Travel"]
        );
    }

    // ── Loading and reference data ──────────────────────────────────

    #[tokio::test]
    async fn load_replaces_list_and_remembers_filter() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(1)]);
        ledger.api().inner.lock().unwrap().server_list = vec![coffee(2), coffee(3)];

        let filter = FilterCriteria::new().base_currency("EUR");
        assert_eq!(ledger.load(filter.clone()).await.unwrap(), 2);
        assert_eq!(ledger.transactions().unwrap(), vec![coffee(2), coffee(3)]);
        assert_eq!(ledger.last_filter().unwrap(), Some(filter));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn load_skips_records_deleted_while_fetching() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(1), coffee(2)]);
        {
            let mut mock = ledger.api().inner.lock().unwrap();
            mock.server_list = vec![coffee(1), coffee(2)];
            mock.fetch_delay = Some(Duration::from_millis(100));
        }

        let (loaded, deleted) = tokio::join!(ledger.load(FilterCriteria::new()), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ledger.delete(TransactionId::new(1)).await
        });

        assert!(deleted.unwrap());
        assert_eq!(loaded.unwrap(), 1);
        assert_eq!(ledger.transactions().unwrap(), vec![coffee(2)]);
        assert_eq!(ledger.deleted().unwrap(), vec![coffee(1)]);
    }

    #[tokio::test]
    async fn inverted_filter_is_rejected_before_request() {
        let ledger = ledger(1);
        let filter = FilterCriteria::new().amount_range(Some(10.0), Some(-10.0));
        let err = ledger.load(filter).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidFilter(_)));
        assert!(ledger.api().calls().is_empty());
    }

    #[tokio::test]
    async fn entities_populate_indexes() {
        let ledger = ledger(1);
        ledger.load_entities().await.unwrap();
        assert_eq!(ledger.main_currency().unwrap().as_deref(), Some("CZK"));
        assert_eq!(ledger.currencies().unwrap().len(), 3);
        assert_eq!(ledger.base_currencies().unwrap(), vec!["CZK", "EUR"]);
        assert_eq!(ledger.banks().unwrap(), vec![bank(2, "Revolut")]);
        assert_eq!(ledger.available_banks().unwrap().len(), 2);
        assert_eq!(
            ledger.bank_by_name("Equabank").unwrap(),
            Some(bank(3, "Equabank"))
        );
        assert_eq!(ledger.user().unwrap().map(|u| u.id), Some(UserId::new(1)));
        assert_eq!(
            ledger.view().inner.lock().unwrap().category_names,
            vec!["A", "B"]
        );
    }

    #[tokio::test]
    async fn rows_resolve_names_after_entities() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(1)]);
        ledger.load_entities().await.unwrap();
        let rows = ledger.view().inner.lock().unwrap().last_rows.clone();
        assert_eq!(rows[0].category, "A");
        assert_eq!(rows[0].bank, "Revolut");
        let weights = ledger.category_weights().unwrap();
        assert_eq!(weights.get("A"), Some(-3.5));
    }

    #[tokio::test]
    async fn local_filtering() {
        let ledger = ledger(1);
        seed(&ledger, vec![with_category(1, 1), with_category(2, 2)]);
        let found = ledger
            .filtered(&FilterCriteria::new().category(CategoryId::new(2)))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, TransactionId::new(2));
        assert!(ledger.api().calls().is_empty());
    }

    // ── Bulk operations ─────────────────────────────────────────────

    #[tokio::test]
    async fn delete_all_empties_active_list() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(1), coffee(2), coffee(3)]);
        let count = ledger.delete_all_transactions(UserId::new(1)).await.unwrap();
        assert_eq!(count, 3);
        assert!(ledger.transactions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn monthly_summary_feeds_cash_flow_chart() {
        let ledger = ledger(1);
        let months = ledger.monthly_summary(UserId::new(1)).await.unwrap();
        assert_eq!(months.len(), 1);
        assert_eq!(ledger.view().inner.lock().unwrap().cash_flow, months);
    }

    #[tokio::test]
    async fn successful_upload_reloads_with_last_filter() {
        let ledger = ledger(1);
        let filter = FilterCriteria::new().base_currency("CZK");
        let _count = ledger.load(filter.clone()).await.unwrap();
        ledger.api().inner.lock().unwrap().server_list = vec![coffee(8)];

        let report = ledger.upload_statements(Vec::new()).await.unwrap();
        assert_eq!(report.status, UploadStatus::Complete);
        assert_eq!(ledger.transactions().unwrap(), vec![coffee(8)]);
        assert_eq!(ledger.api().calls(), vec!["fetch", "upload 0", "fetch"]);
        assert_eq!(ledger.last_filter().unwrap(), Some(filter));
    }

    #[tokio::test]
    async fn rejected_upload_does_not_reload() {
        let ledger = ledger(1);
        ledger.api().inner.lock().unwrap().upload_status = Some(UploadStatus::Rejected);
        let report = ledger.upload_statements(Vec::new()).await.unwrap();
        assert_eq!(report.status, UploadStatus::Rejected);
        assert_eq!(ledger.api().calls(), vec!["upload 0"]);
    }

    // ── Account ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn currency_change_reloads_amounts() {
        let ledger = ledger(1);
        ledger.load_entities().await.unwrap();
        let filter = FilterCriteria::new().base_currency("EUR");
        let _count = ledger.load(filter.clone()).await.unwrap();
        ledger.api().inner.lock().unwrap().server_list = vec![coffee(4)];

        let details = ledger
            .modify_user(UserId::new(1), &UserPatch::new().main_currency("EUR"))
            .await
            .unwrap();
        assert_eq!(details.id, UserId::new(1));
        assert_eq!(ledger.main_currency().unwrap().as_deref(), Some("EUR"));
        assert_eq!(ledger.transactions().unwrap(), vec![coffee(4)]);
        assert_eq!(ledger.last_filter().unwrap(), Some(filter));
        assert_eq!(ledger.api().calls().last().map(String::as_str), Some("fetch"));
    }

    #[tokio::test]
    async fn profile_edit_without_currency_change_does_not_reload() {
        let ledger = ledger(1);
        ledger.load_entities().await.unwrap();
        let details = ledger
            .modify_user(UserId::new(1), &UserPatch::new().username("janed"))
            .await
            .unwrap();
        assert_eq!(details.username, "janed");
        assert_eq!(ledger.user().unwrap().map(|u| u.username).as_deref(), Some("janed"));
        assert_eq!(ledger.main_currency().unwrap().as_deref(), Some("CZK"));
        assert!(!ledger.api().calls().contains(&"fetch".to_owned()));
    }

    #[tokio::test]
    async fn failed_profile_edit_keeps_cached_account() {
        let ledger = ledger(1);
        ledger.load_entities().await.unwrap();
        ledger.api().set_fail(true);
        let patch = UserPatch::new().main_currency("USD");
        assert!(ledger.modify_user(UserId::new(1), &patch).await.is_err());
        assert_eq!(ledger.main_currency().unwrap().as_deref(), Some("CZK"));
    }

    #[tokio::test]
    async fn change_password_reaches_backend() {
        let ledger = ledger(1);
        ledger
            .change_password(UserId::new(1), &PasswordChange::new("old-pass", "new-pass"))
            .await
            .unwrap();
        assert_eq!(ledger.api().calls(), vec!["change password 1"]);
    }

    #[tokio::test]
    async fn deleting_account_empties_cache() {
        let ledger = ledger(1);
        ledger.load_entities().await.unwrap();
        seed(&ledger, vec![coffee(1), coffee(2)]);
        let _moved = ledger.delete(TransactionId::new(2)).await.unwrap();

        ledger.delete_user(UserId::new(1)).await.unwrap();
        assert!(ledger.transactions().unwrap().is_empty());
        assert!(ledger.deleted().unwrap().is_empty());
        assert!(ledger.categories().unwrap().is_empty());
        assert!(ledger.user().unwrap().is_none());
        assert!(ledger.view().inner.lock().unwrap().category_names.is_empty());
    }

    // ── Session mirror ──────────────────────────────────────────────

    #[tokio::test]
    async fn snapshot_round_trip_through_session() {
        let source = ledger(20);
        source.load_entities().await.unwrap();
        seed(&source, vec![coffee(1), coffee(2)]);
        let _moved = source.delete(TransactionId::new(2)).await.unwrap();

        let session = InMemorySession::new();
        source.persist(&session).unwrap();

        let target = ledger(30);
        assert!(target.resume(&session).unwrap());
        assert_eq!(target.transactions().unwrap(), vec![coffee(1)]);
        assert_eq!(target.deleted().unwrap(), vec![coffee(2)]);
        assert_eq!(target.categories().unwrap().len(), 2);
        assert_eq!(target.table().unwrap()[0].category, "A");
    }

    #[tokio::test]
    async fn restored_rows_resolve_importable_banks() {
        let source = ledger(1);
        source.load_entities().await.unwrap();
        seed(
            &source,
            vec![Transaction {
                bank: Some(BankId::new(3)),
                ..coffee(1)
            }],
        );
        let session = InMemorySession::new();
        source.persist(&session).unwrap();

        let target = ledger(1);
        assert!(target.resume(&session).unwrap());
        assert_eq!(target.available_banks().unwrap().len(), 2);
        assert_eq!(target.table().unwrap()[0].bank, "Equabank");
    }

    #[tokio::test]
    async fn resume_without_snapshot() {
        let ledger = ledger(1);
        assert!(!ledger.resume(&InMemorySession::new()).unwrap());
    }

    #[tokio::test]
    async fn discard_deleted_is_terminal() {
        let ledger = ledger(1);
        seed(&ledger, vec![coffee(1)]);
        let _moved = ledger.delete(TransactionId::new(1)).await.unwrap();
        assert_eq!(ledger.discard_deleted().unwrap(), 1);
        assert!(matches!(
            ledger.undo_delete().await,
            Err(LedgerError::NothingToUndo)
        ));
    }
}
