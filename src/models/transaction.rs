//! Transaction model, its insert draft and its partial-update patch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BankId, CategoryId, TransactionId};

/// A single ledger entry as the server stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Server-assigned identifier.
    pub id: TransactionId,
    /// Display name (counterparty or statement description).
    pub info: Option<String>,
    /// Free-form title.
    pub title: Option<String>,
    /// Signed amount in the user's main currency, computed by the server.
    pub amount: Option<f64>,
    /// Signed amount in the statement currency.
    pub base_amount: f64,
    /// ISO code of the statement currency.
    pub base_currency: String,
    /// Assigned category, `None` for uncategorized.
    pub category: Option<CategoryId>,
    /// Booking date, either `YYYY-MM-DD` or a full ISO date-time.
    pub date: String,
    /// Where the payment happened.
    pub place: Option<String>,
    /// Bank the transaction was imported from.
    pub bank: Option<BankId>,
    /// When the record was created on the server.
    pub creation_date: Option<String>,
}

impl Transaction {
    /// Returns the booking day, ignoring any time component.
    #[inline]
    #[must_use]
    pub fn day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(date_part(&self.date), "%Y-%m-%d").ok()
    }

    /// Amount used for per-category totals: the main-currency amount, or
    /// the base amount when the server has not computed one.
    #[inline]
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.amount.unwrap_or(self.base_amount)
    }

    /// Builds an insert draft carrying every user-supplied field.
    ///
    /// Used to resubmit a soft-deleted record; the server hands out a new id.
    #[inline]
    #[must_use]
    pub fn to_draft(&self) -> TransactionDraft {
        TransactionDraft {
            info: self.info.clone(),
            title: self.title.clone(),
            amount: self.amount,
            base_amount: self.base_amount,
            base_currency: self.base_currency.clone(),
            category: self.category,
            date: self.date.clone(),
            place: self.place.clone(),
            bank: self.bank,
        }
    }
}

/// Strips the time component from an ISO date or date-time string.
#[inline]
#[must_use]
pub fn date_part(value: &str) -> &str {
    value.split_once('T').map_or(value, |(day, _)| day)
}

/// A transaction that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Free-form title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Main-currency amount, if already known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Signed amount in the statement currency.
    pub base_amount: f64,
    /// ISO code of the statement currency.
    pub base_currency: String,
    /// Category to assign.
    pub category: Option<CategoryId>,
    /// Booking date.
    pub date: String,
    /// Where the payment happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    /// Originating bank.
    pub bank: Option<BankId>,
}

impl TransactionDraft {
    /// Creates a draft with the fields the server requires.
    #[inline]
    #[must_use]
    pub fn new<C: Into<String>, D: Into<String>>(base_amount: f64, base_currency: C, date: D) -> Self {
        Self {
            info: None,
            title: None,
            amount: None,
            base_amount,
            base_currency: base_currency.into(),
            category: None,
            date: date.into(),
            place: None,
            bank: None,
        }
    }

    /// Sets the display name.
    #[inline]
    #[must_use]
    pub fn info<T: Into<String>>(mut self, info: T) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Sets the title.
    #[inline]
    #[must_use]
    pub fn title<T: Into<String>>(mut self, title: T) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the main-currency amount.
    #[inline]
    #[must_use]
    pub const fn amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Assigns a category.
    #[inline]
    #[must_use]
    pub const fn category(mut self, id: CategoryId) -> Self {
        self.category = Some(id);
        self
    }

    /// Sets the place.
    #[inline]
    #[must_use]
    pub fn place<T: Into<String>>(mut self, place: T) -> Self {
        self.place = Some(place.into());
        self
    }

    /// Sets the originating bank.
    #[inline]
    #[must_use]
    pub const fn bank(mut self, id: BankId) -> Self {
        self.bank = Some(id);
        self
    }
}

/// Changed fields of an existing transaction.
///
/// Only the fields the server accepts on modify are present. For
/// `category` and `bank` the outer `Option` says whether the field changed
/// and the inner one whether it is set or cleared, so `Some(None)` goes out
/// as an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[allow(
    clippy::option_option,
    reason = "an absent field and an explicit null are different requests"
)]
pub struct TransactionPatch {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    /// New category (`Some(None)` clears it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<CategoryId>>,
    /// New bank (`Some(None)` clears it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<Option<BankId>>,
}

impl TransactionPatch {
    /// Creates an empty patch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes the display name.
    #[inline]
    #[must_use]
    pub fn info<T: Into<String>>(mut self, info: T) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Changes the title.
    #[inline]
    #[must_use]
    pub fn title<T: Into<String>>(mut self, title: T) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Changes the place.
    #[inline]
    #[must_use]
    pub fn place<T: Into<String>>(mut self, place: T) -> Self {
        self.place = Some(place.into());
        self
    }

    /// Sets or clears the category.
    #[inline]
    #[must_use]
    pub const fn category(mut self, id: Option<CategoryId>) -> Self {
        self.category = Some(id);
        self
    }

    /// Sets or clears the bank.
    #[inline]
    #[must_use]
    pub const fn bank(mut self, id: Option<BankId>) -> Self {
        self.bank = Some(id);
        self
    }

    /// Returns `true` if the patch changes nothing.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.info.is_none()
            && self.title.is_none()
            && self.place.is_none()
            && self.category.is_none()
            && self.bank.is_none()
    }

    /// Writes the changed fields onto `tx`, leaving every other field alone.
    #[inline]
    pub fn apply_to(&self, tx: &mut Transaction) {
        if let Some(info) = self.info.as_ref() {
            tx.info = Some(info.clone());
        }
        if let Some(title) = self.title.as_ref() {
            tx.title = Some(title.clone());
        }
        if let Some(place) = self.place.as_ref() {
            tx.place = Some(place.clone());
        }
        if let Some(category) = self.category {
            tx.category = category;
        }
        if let Some(bank) = self.bank {
            tx.bank = bank;
        }
    }
}

/// Response body that is either bare or wrapped as `{"transactions": ...}`.
///
/// The backend's transaction schema wraps every dump in that envelope, but
/// older routes return the record directly.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    /// `{"transactions": value}`.
    Wrapped {
        /// The wrapped value.
        transactions: T,
    },
    /// The value itself.
    Bare(T),
}

impl<T> Envelope<T> {
    /// Returns the payload regardless of shape.
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped { transactions } | Self::Bare(transactions) => transactions,
        }
    }
}
