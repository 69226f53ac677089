//! View collaborators refreshed after every cache mutation.
//!
//! Rendering is someone else's job. This module defines what a renderer
//! is told ([`LedgerView`]) and prepares the data it needs: table rows with
//! reference ids resolved to names, and per-category totals for the
//! category chart.

use crate::models::{
    Bank, BankId, Category, CategoryId, MonthlySaldo, Transaction, TransactionId, date_part,
};

/// Receiver of cache change notifications.
///
/// Every method has an empty default so a renderer only implements what
/// it draws.
pub trait LedgerView: core::fmt::Debug + Send + Sync {
    /// Redraws the transaction table.
    #[inline]
    fn refresh_table(&self, _rows: &[TableRow]) {}

    /// Redraws the category breakdown chart.
    #[inline]
    fn refresh_category_chart(&self, _weights: &CategoryWeights) {}

    /// Redraws the monthly cash-flow chart.
    #[inline]
    fn refresh_cash_flow(&self, _months: &[MonthlySaldo]) {}

    /// Re-tags anything rendered for `old` so it refers to `new`.
    ///
    /// Called when an undone delete comes back under a fresh id.
    #[inline]
    fn rekey_row(&self, _old: TransactionId, _new: TransactionId) {}

    /// Redraws category and bank dropdowns and checkboxes.
    #[inline]
    fn refresh_reference_lists(&self, _categories: &[Category], _banks: &[Bank]) {}
}

/// View that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopView;

impl LedgerView for NoopView {}

/// One displayed table row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Transaction the row shows; editable cells are keyed by it.
    pub id: TransactionId,
    /// Display name.
    pub info: String,
    /// Title.
    pub title: String,
    /// Main-currency amount, if computed.
    pub amount: Option<f64>,
    /// Statement-currency amount.
    pub base_amount: f64,
    /// Statement currency.
    pub base_currency: String,
    /// Category name, empty when uncategorized.
    pub category: String,
    /// Booking day without time.
    pub date: String,
    /// Place.
    pub place: String,
    /// Bank name, empty when unknown.
    pub bank: String,
    /// Creation day without time.
    pub creation_date: String,
}

/// Builds table rows, resolving category and bank ids to display names.
///
/// `category_name` and `bank_name` return `None` for ids that are no longer
/// known, which renders as an empty cell.
#[inline]
#[must_use]
pub fn table_rows<C, B>(transactions: &[Transaction], category_name: C, bank_name: B) -> Vec<TableRow>
where
    C: Fn(CategoryId) -> Option<String>,
    B: Fn(BankId) -> Option<String>,
{
    transactions
        .iter()
        .map(|tx| TableRow {
            id: tx.id,
            info: tx.info.clone().unwrap_or_default(),
            title: tx.title.clone().unwrap_or_default(),
            amount: tx.amount,
            base_amount: tx.base_amount,
            base_currency: tx.base_currency.clone(),
            category: tx.category.and_then(&category_name).unwrap_or_default(),
            date: date_part(&tx.date).to_owned(),
            place: tx.place.clone().unwrap_or_default(),
            bank: tx.bank.and_then(&bank_name).unwrap_or_default(),
            creation_date: tx
                .creation_date
                .as_deref()
                .map(date_part)
                .unwrap_or_default()
                .to_owned(),
        })
        .collect()
}

/// Per-category totals in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryWeights {
    /// `(label, total)` pairs; uncategorized totals use an empty label.
    entries: Vec<(String, f64)>,
}

impl CategoryWeights {
    /// Sums transaction weights per category name, rounding each total to
    /// two decimals.
    #[inline]
    #[must_use]
    pub fn from_transactions<C>(transactions: &[Transaction], category_name: C) -> Self
    where
        C: Fn(CategoryId) -> Option<String>,
    {
        let mut entries: Vec<(String, f64)> = Vec::new();
        for tx in transactions {
            let label = tx.category.and_then(&category_name).unwrap_or_default();
            match entries.iter_mut().find(|entry| entry.0 == label) {
                Some(entry) => entry.1 += tx.weight(),
                None => entries.push((label, tx.weight())),
            }
        }
        for entry in &mut entries {
            entry.1 = round_cents(entry.1);
        }
        Self { entries }
    }

    /// Returns the `(label, total)` pairs.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    /// Returns the chart labels.
    #[inline]
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.0.as_str())
    }

    /// Returns the total for `label`.
    #[inline]
    #[must_use]
    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.0 == label)
            .map(|entry| entry.1)
    }

    /// Returns `true` if there are no totals.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rounds to two decimal places, absorbing float summation noise.
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
