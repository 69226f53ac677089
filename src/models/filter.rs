//! Filter criteria for fetching transactions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BankId, CategoryId, Transaction};
use crate::error::{LedgerError, Result};

/// Inclusive lower and upper bound; either side may be open.
///
/// Both keys are always serialized because the server reads them
/// unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    /// Lower bound (inclusive).
    pub min: Option<T>,
    /// Upper bound (inclusive).
    pub max: Option<T>,
}

impl<T> Default for Bounds<T> {
    #[inline]
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd> Bounds<T> {
    /// Returns `true` when both ends are set and the lower one is larger.
    #[inline]
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        match (self.min.as_ref(), self.max.as_ref()) {
            (Some(min), Some(max)) => min > max,
            _ => false,
        }
    }

    /// Returns `true` if `value` lies within the bounds.
    #[inline]
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.min.as_ref().is_none_or(|min| value >= min)
            && self.max.as_ref().is_none_or(|max| value <= max)
    }

    /// Returns `true` when neither end is set.
    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Composable filter sent to the fetch endpoint.
///
/// All criteria are combined; an empty list means "any".
///
/// # Examples
///
/// ```
/// use ledger_sync::models::{CategoryId, FilterCriteria, NaiveDate};
///
/// let filter = FilterCriteria::new()
///     .date_range(
///         NaiveDate::from_ymd_opt(2023, 1, 1),
///         NaiveDate::from_ymd_opt(2023, 12, 31),
///     )
///     .amount_range(Some(-500.0), None)
///     .category(CategoryId::new(4));
/// assert!(filter.validate().is_ok());
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Bounds on the base amount.
    pub amount: Bounds<f64>,
    /// Bounds on the booking day.
    pub date: Bounds<NaiveDate>,
    /// Accepted statement currencies.
    #[serde(default)]
    pub base_currency: Vec<String>,
    /// Accepted banks.
    #[serde(default)]
    pub bank: Vec<BankId>,
    /// Accepted categories.
    #[serde(default)]
    pub category: Vec<CategoryId>,
}

impl FilterCriteria {
    /// Creates an empty filter that matches all transactions.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the base amount to `[min, max]`.
    #[inline]
    #[must_use]
    pub const fn amount_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.amount = Bounds { min, max };
        self
    }

    /// Restricts the booking day to `[from, to]`.
    #[inline]
    #[must_use]
    pub const fn date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date = Bounds { min: from, max: to };
        self
    }

    /// Accepts transactions in the given statement currency.
    #[inline]
    #[must_use]
    pub fn base_currency<T: Into<String>>(mut self, code: T) -> Self {
        self.base_currency.push(code.into());
        self
    }

    /// Accepts transactions from the given bank.
    #[inline]
    #[must_use]
    pub fn bank(mut self, id: BankId) -> Self {
        self.bank.push(id);
        self
    }

    /// Accepts transactions in the given category.
    #[inline]
    #[must_use]
    pub fn category(mut self, id: CategoryId) -> Self {
        self.category.push(id);
        self
    }

    /// Rejects ranges whose lower end is above the upper end.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidFilter`] naming the offending range.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.amount.is_inverted() {
            return Err(LedgerError::InvalidFilter(
                "amount: lower end cannot be higher than higher end".to_owned(),
            ));
        }
        if self.date.is_inverted() {
            return Err(LedgerError::InvalidFilter(
                "date: lower end cannot be higher than higher end".to_owned(),
            ));
        }
        Ok(())
    }

    /// Returns `true` if the transaction satisfies all set criteria.
    #[inline]
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.matches_amount(tx)
            && self.matches_date(tx)
            && self.matches_currency(tx)
            && self.matches_bank(tx)
            && self.matches_category(tx)
    }

    /// Checks amount criteria.
    fn matches_amount(&self, tx: &Transaction) -> bool {
        self.amount.contains(&tx.base_amount)
    }

    /// Checks date criteria; undated records only pass an open range.
    fn matches_date(&self, tx: &Transaction) -> bool {
        self.date.is_open() || tx.day().is_some_and(|day| self.date.contains(&day))
    }

    /// Checks currency criteria.
    fn matches_currency(&self, tx: &Transaction) -> bool {
        self.base_currency.is_empty() || self.base_currency.contains(&tx.base_currency)
    }

    /// Checks bank criteria.
    fn matches_bank(&self, tx: &Transaction) -> bool {
        self.bank.is_empty() || tx.bank.is_some_and(|bank| self.bank.contains(&bank))
    }

    /// Checks category criteria.
    fn matches_category(&self, tx: &Transaction) -> bool {
        self.category.is_empty()
            || tx
                .category
                .is_some_and(|category| self.category.contains(&category))
    }
}
