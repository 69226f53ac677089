//! Data models for the ledger API.
//!
//! Strongly-typed representations of the records the backend exchanges,
//! newtype ID wrappers, and the request shapes for partial updates and
//! filtering.

mod account;
mod entities;
mod filter;
mod ids;
mod reference;
mod summary;
mod transaction;
mod upload;

pub use account::{PasswordChange, UserPatch, UserRecord};
pub use chrono::NaiveDate;
pub use entities::{SessionEntities, UserDetails, UserEntities};
pub use filter::{Bounds, FilterCriteria};
pub use ids::{BankId, CategoryId, TransactionId, UserId};
pub use reference::{Bank, Category, CategoryDraft, CategoryPatch, CategoryRef};
pub use summary::{DeletedCount, MonthlySaldo};
pub(crate) use transaction::Envelope;
pub use transaction::{Transaction, TransactionDraft, TransactionPatch, date_part};
pub use upload::{StatementFile, UploadOutcome, UploadReport, UploadStatus};
