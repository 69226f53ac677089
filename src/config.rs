//! Runtime configuration read from environment variables.
//!
//! | Variable | Meaning |
//! |---|---|
//! | `LEDGER_BASE_URL` | Backend address (default `http://127.0.0.1:5000`) |
//! | `LEDGER_CSRF_TOKEN` | Anti-forgery token (required) |
//! | `LEDGER_SESSION_COOKIE` | Authenticated session cookie, `name=value` |
//! | `LEDGER_SESSION_DIR` | Directory of the session mirror file |

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::{LedgerError, Result};

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Environment variable holding the backend address.
pub const BASE_URL_ENV: &str = "LEDGER_BASE_URL";

/// Environment variable holding the CSRF token.
pub const CSRF_TOKEN_ENV: &str = "LEDGER_CSRF_TOKEN";

/// Environment variable holding the session cookie.
pub const SESSION_COOKIE_ENV: &str = "LEDGER_SESSION_COOKIE";

/// Environment variable overriding the session mirror directory.
pub const SESSION_DIR_ENV: &str = "LEDGER_SESSION_DIR";

/// Settings needed to reach the backend and mirror the session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend address without a trailing slash.
    pub base_url: String,
    /// Anti-forgery token.
    pub csrf_token: SecretString,
    /// Authenticated session cookie.
    pub session_cookie: Option<SecretString>,
    /// Session mirror directory; `None` means the platform default.
    pub session_dir: Option<PathBuf>,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingCsrfToken`] if `LEDGER_CSRF_TOKEN` is
    /// unset or blank, or [`LedgerError::Config`] for a malformed base URL.
    #[inline]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    #[inline]
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let base_url = read(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(LedgerError::Config(format!(
                "{BASE_URL_ENV} must start with http:// or https://, got '{base_url}'"
            )));
        }
        let csrf_token = read(CSRF_TOKEN_ENV).ok_or(LedgerError::MissingCsrfToken)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            csrf_token: SecretString::from(csrf_token),
            session_cookie: read(SESSION_COOKIE_ENV).map(SecretString::from),
            session_dir: read(SESSION_DIR_ENV).map(PathBuf::from),
        })
    }

    /// Builds an HTTP client from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Http`] if the HTTP client fails to build.
    #[cfg(feature = "async")]
    #[inline]
    pub fn client(&self) -> Result<crate::client::LedgerClient> {
        use secrecy::ExposeSecret as _;

        let mut builder = crate::client::LedgerClient::builder()
            .base_url(self.base_url.as_str())
            .csrf_token(self.csrf_token.expose_secret());
        if let Some(cookie) = self.session_cookie.as_ref() {
            builder = builder.session_cookie(cookie.expose_secret());
        }
        builder.build()
    }
}
