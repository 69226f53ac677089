//! Request/response contract with the ledger backend.
//!
//! [`Api`] is what the transaction cache talks to. The HTTP implementation
//! is [`crate::client::LedgerClient`]; tests plug in an in-memory double.

use core::future::Future;

use crate::error::Result;
use crate::models::{
    Category, CategoryDraft, CategoryId, CategoryPatch, DeletedCount, FilterCriteria,
    MonthlySaldo, PasswordChange, SessionEntities, StatementFile, Transaction, TransactionDraft,
    TransactionId, TransactionPatch, UploadReport, UserEntities, UserId, UserPatch, UserRecord,
};

/// Async backend used by [`crate::cache::Ledger`].
///
/// Every method resolves to an error for transport failures and non-2xx
/// responses; callers must not touch local state in that case.
pub trait Api: core::fmt::Debug + Send + Sync {
    /// Fetches the transactions matching `filter`, newest first.
    fn fetch_transactions(
        &self,
        filter: &FilterCriteria,
    ) -> impl Future<Output = Result<Vec<Transaction>>> + Send;

    /// Stores a new transaction and returns the server's full record.
    fn add_transaction(
        &self,
        draft: &TransactionDraft,
    ) -> impl Future<Output = Result<Transaction>> + Send;

    /// Applies changed fields to a transaction and returns the stored record.
    fn modify_transaction(
        &self,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> impl Future<Output = Result<Transaction>> + Send;

    /// Deletes one transaction.
    fn delete_transaction(&self, id: TransactionId) -> impl Future<Output = Result<()>> + Send;

    /// Deletes every transaction of a user.
    fn delete_all_transactions(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<DeletedCount>> + Send;

    /// Creates a category.
    fn add_category(
        &self,
        draft: &CategoryDraft,
    ) -> impl Future<Output = Result<Category>> + Send;

    /// Modifies a category and returns the stored record.
    fn modify_category(
        &self,
        id: CategoryId,
        patch: &CategoryPatch,
    ) -> impl Future<Output = Result<Category>> + Send;

    /// Deletes a batch of categories and returns the deleted records.
    fn delete_categories(
        &self,
        ids: &[CategoryId],
    ) -> impl Future<Output = Result<Vec<Category>>> + Send;

    /// Loads the signed-in user's reference data.
    fn user_entities(&self) -> impl Future<Output = Result<UserEntities>> + Send;

    /// Loads application-wide reference data.
    fn session_entities(&self) -> impl Future<Output = Result<SessionEntities>> + Send;

    /// Loads month-by-month cash flow for a user.
    fn monthly_summary(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<MonthlySaldo>>> + Send;

    /// Uploads statement files for import.
    ///
    /// The documented partial-failure statuses resolve to `Ok`.
    fn upload_statements(
        &self,
        files: Vec<StatementFile>,
    ) -> impl Future<Output = Result<UploadReport>> + Send;

    /// Changes profile fields and returns the stored user record.
    fn modify_user(
        &self,
        user: UserId,
        patch: &UserPatch,
    ) -> impl Future<Output = Result<UserRecord>> + Send;

    /// Replaces the account password.
    fn change_password(
        &self,
        user: UserId,
        change: &PasswordChange,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Deletes the account together with all of its data.
    fn delete_user(&self, user: UserId) -> impl Future<Output = Result<()>> + Send;
}
