//! Account settings: profile edits and password changes.

use secrecy::{ExposeSecret as _, SecretString};
use serde::ser::SerializeStruct as _;
use serde::{Deserialize, Serialize, Serializer};

use super::UserDetails;

/// Changed profile fields (`PATCH /api/users/{id}/modify`).
///
/// Changing `main_currency` makes the server convert every stored amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserPatch {
    /// New login name (a single alphanumeric word).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// New family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// New main currency code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_currency: Option<String>,
}

impl UserPatch {
    /// Creates an empty patch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes the login name.
    #[inline]
    #[must_use]
    pub fn username<T: Into<String>>(mut self, username: T) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Changes the given name.
    #[inline]
    #[must_use]
    pub fn first_name<T: Into<String>>(mut self, name: T) -> Self {
        self.first_name = Some(name.into());
        self
    }

    /// Changes the family name.
    #[inline]
    #[must_use]
    pub fn last_name<T: Into<String>>(mut self, name: T) -> Self {
        self.last_name = Some(name.into());
        self
    }

    /// Changes the currency amounts are converted into.
    #[inline]
    #[must_use]
    pub fn main_currency<T: Into<String>>(mut self, code: T) -> Self {
        self.main_currency = Some(code.into());
        self
    }

    /// Returns `true` if the patch changes nothing.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.main_currency.is_none()
    }
}

/// User record returned by a profile edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Account details.
    #[serde(flatten)]
    pub details: UserDetails,
    /// Currency amounts are converted into.
    pub main_currency: String,
}

/// Password change request (`PATCH /api/users/{id}/change_password`).
///
/// Both passwords stay redacted in `Debug` output; they are only exposed
/// when the request body is serialized.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    /// Current password.
    old_password: SecretString,
    /// Replacement password.
    new_password: SecretString,
}

impl PasswordChange {
    /// Creates a change from the current and the replacement password.
    #[inline]
    #[must_use]
    pub fn new<O: Into<String>, N: Into<String>>(old_password: O, new_password: N) -> Self {
        Self {
            old_password: SecretString::from(old_password.into()),
            new_password: SecretString::from(new_password.into()),
        }
    }
}

impl Serialize for PasswordChange {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // The server wants the replacement twice.
        let mut body = serializer.serialize_struct("PasswordChange", 3)?;
        body.serialize_field("old_password", self.old_password.expose_secret())?;
        body.serialize_field("new_password", self.new_password.expose_secret())?;
        body.serialize_field("repeat_password", self.new_password.expose_secret())?;
        body.end()
    }
}
