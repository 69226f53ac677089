//! Category and bank reference entities.

use serde::{Deserialize, Serialize};

use super::{BankId, CategoryId};

/// A user-defined transaction category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Server-assigned identifier.
    pub id: CategoryId,
    /// Display name, unique per user.
    pub name: String,
}

/// A category that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    /// Display name. The server accepts a single word.
    pub name: String,
}

impl CategoryDraft {
    /// Creates a draft with the given name.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self { name: name.into() }
    }
}

/// Changed fields of an existing category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryPatch {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CategoryPatch {
    /// Creates a patch renaming the category.
    #[inline]
    #[must_use]
    pub fn rename<T: Into<String>>(name: T) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Reference to a category in a batch delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    /// Category to delete.
    pub id: CategoryId,
}

/// A bank the server can import statements from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    /// Server-assigned identifier.
    pub id: BankId,
    /// Display name; also the multipart field name for statement uploads.
    pub name: String,
}
