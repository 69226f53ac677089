//! Aggregates computed by the server.

use serde::{Deserialize, Serialize};

/// Cash flow of one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySaldo {
    /// Month in `YYYY-MM` form.
    pub month: String,
    /// Sum of positive amounts.
    pub incoming: f64,
    /// Sum of negative amounts (zero or below).
    pub outgoing: f64,
    /// `incoming + outgoing`.
    pub balance: f64,
}

/// Result of deleting every transaction of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedCount {
    /// Number of rows the server removed.
    pub number_of_deleted: u64,
}
