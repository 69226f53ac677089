//! Newtype wrappers for entity identifiers.
//!
//! The backend hands out plain integer keys for every table; wrapping them
//! keeps a category id from being passed where a transaction id belongs.

use serde::{Deserialize, Serialize};

/// Declares an `i64` key newtype with serde passthrough.
macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database key.
            #[inline]
            #[must_use]
            pub const fn new(key: i64) -> Self {
                Self(key)
            }

            /// Returns the raw database key.
            #[inline]
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            #[inline]
            fn from(key: i64) -> Self {
                Self(key)
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

integer_id! {
    /// Server-assigned identifier of a transaction.
    TransactionId
}

integer_id! {
    /// Server-assigned identifier of a user-owned category.
    CategoryId
}

integer_id! {
    /// Server-assigned identifier of a bank.
    BankId
}

integer_id! {
    /// Server-assigned identifier of a user account.
    UserId
}
