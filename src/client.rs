//! Async HTTP client for the ledger backend.

use reqwest::header::COOKIE;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret as _, SecretString};

use crate::api::Api;
use crate::config::DEFAULT_BASE_URL;
use crate::error::{LedgerError, Result};
use crate::models::{
    Category, CategoryDraft, CategoryId, CategoryPatch, CategoryRef, DeletedCount, Envelope,
    FilterCriteria, MonthlySaldo, PasswordChange, SessionEntities, StatementFile, Transaction,
    TransactionDraft, TransactionId, TransactionPatch, UploadOutcome, UploadReport, UploadStatus,
    UserEntities, UserId, UserPatch, UserRecord,
};

/// Header carrying the anti-forgery token on every request.
const CSRF_HEADER: &str = "X-CSRFToken";

/// Add-transaction endpoint path.
const ADD_TRANSACTION_PATH: &str = "/api/transactions/add";

/// Filtered-fetch endpoint path.
const FETCH_TRANSACTIONS_PATH: &str = "/api/transactions/fetch";

/// Statement upload endpoint path.
const UPLOAD_PATH: &str = "/api/transactions/upload";

/// Add-category endpoint path.
const ADD_CATEGORY_PATH: &str = "/api/categories/add";

/// Batch category delete endpoint path.
const DELETE_CATEGORIES_PATH: &str = "/api/categories/delete";

/// User reference data endpoint path.
const USER_ENTITIES_PATH: &str = "/api/user/entities";

/// Application reference data endpoint path.
const SESSION_ENTITIES_PATH: &str = "/api/entities";

/// Builder for constructing a [`LedgerClient`].
#[derive(Debug)]
pub struct LedgerClientBuilder {
    /// Anti-forgery token sent with every request.
    csrf_token: Option<SecretString>,
    /// Authenticated session cookie (`name=value`).
    session_cookie: Option<SecretString>,
    /// Base URL override.
    base_url: Option<String>,
}

impl LedgerClientBuilder {
    /// Sets the CSRF token read from the page's `csrf-token` meta field.
    #[inline]
    #[must_use]
    pub fn csrf_token<T: Into<String>>(mut self, token: T) -> Self {
        self.csrf_token = Some(SecretString::from(token.into()));
        self
    }

    /// Sets the session cookie, e.g. `session=abc123`.
    #[inline]
    #[must_use]
    pub fn session_cookie<T: Into<String>>(mut self, cookie: T) -> Self {
        self.session_cookie = Some(SecretString::from(cookie.into()));
        self
    }

    /// Overrides the base URL (useful for testing with a mock server).
    #[inline]
    #[must_use]
    pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingCsrfToken`] if no token was provided.
    /// Returns [`LedgerError::Http`] if the HTTP client fails to build.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn build(self) -> Result<LedgerClient> {
        let csrf_token = self.csrf_token.ok_or(LedgerError::MissingCsrfToken)?;
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        tracing::debug!(base_url = %base_url, "building client");
        let http = reqwest::Client::builder().build()?;

        Ok(LedgerClient {
            http,
            csrf_token,
            session_cookie: self.session_cookie,
            base_url,
        })
    }
}

/// Async client for the ledger backend.
///
/// Use [`LedgerClient::builder()`] to construct an instance. All endpoints
/// are reached through the [`Api`] implementation.
#[derive(Debug)]
pub struct LedgerClient {
    /// Underlying HTTP client.
    http: reqwest::Client,
    /// Anti-forgery token.
    csrf_token: SecretString,
    /// Optional session cookie.
    session_cookie: Option<SecretString>,
    /// API base URL without a trailing slash.
    base_url: String,
}

impl LedgerClient {
    /// Creates a new builder for configuring the client.
    #[inline]
    #[must_use]
    pub const fn builder() -> LedgerClientBuilder {
        LedgerClientBuilder {
            csrf_token: None,
            session_cookie: None,
            base_url: None,
        }
    }

    /// Returns the base URL requests are sent to.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Starts a request with the CSRF header and session cookie attached.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        tracing::trace!(method = %method, url = %url, "preparing request");
        let builder = self
            .http
            .request(method, url)
            .header(CSRF_HEADER, self.csrf_token.expose_secret());
        match self.session_cookie.as_ref() {
            Some(cookie) => builder.header(COOKIE, cookie.expose_secret()),
            None => builder,
        }
    }

    /// Sends a request and deserializes a successful JSON response.
    async fn execute<T: serde::de::DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = Self::check_status(builder.send().await?).await?;
        let body = response.text().await?;
        tracing::trace!(body_len = body.len(), "parsing response body");
        serde_json::from_str(&body).map_err(LedgerError::from)
    }

    /// Sends a request, discarding the body of a successful response.
    async fn execute_unit(builder: RequestBuilder) -> Result<()> {
        let _response = Self::check_status(builder.send().await?).await?;
        Ok(())
    }

    /// Turns a non-success response into [`LedgerError::Api`].
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        tracing::debug!(status = %status, "received response");
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_owned());
        tracing::debug!(status = status.as_u16(), message = %message, "API error");
        Err(LedgerError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl Api for LedgerClient {
    #[tracing::instrument(skip_all)]
    async fn fetch_transactions(&self, filter: &FilterCriteria) -> Result<Vec<Transaction>> {
        let builder = self
            .request(Method::POST, FETCH_TRANSACTIONS_PATH)
            .json(filter);
        let envelope: Envelope<Vec<Transaction>> = Self::execute(builder).await?;
        Ok(envelope.into_inner())
    }

    #[tracing::instrument(skip_all)]
    async fn add_transaction(&self, draft: &TransactionDraft) -> Result<Transaction> {
        let builder = self.request(Method::POST, ADD_TRANSACTION_PATH).json(draft);
        let envelope: Envelope<Transaction> = Self::execute(builder).await?;
        Ok(envelope.into_inner())
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    async fn modify_transaction(
        &self,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> Result<Transaction> {
        let path = format!("/api/transactions/{id}/modify");
        let builder = self.request(Method::PATCH, &path).json(patch);
        let envelope: Envelope<Transaction> = Self::execute(builder).await?;
        Ok(envelope.into_inner())
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    async fn delete_transaction(&self, id: TransactionId) -> Result<()> {
        let path = format!("/api/transactions/{id}/delete");
        Self::execute_unit(self.request(Method::DELETE, &path)).await
    }

    #[tracing::instrument(skip_all, fields(user = %user))]
    async fn delete_all_transactions(&self, user: UserId) -> Result<DeletedCount> {
        let path = format!("/api/users/{user}/delete_transactions");
        Self::execute(self.request(Method::DELETE, &path)).await
    }

    #[tracing::instrument(skip_all)]
    async fn add_category(&self, draft: &CategoryDraft) -> Result<Category> {
        Self::execute(self.request(Method::POST, ADD_CATEGORY_PATH).json(draft)).await
    }

    #[tracing::instrument(skip_all, fields(id = %id))]
    async fn modify_category(&self, id: CategoryId, patch: &CategoryPatch) -> Result<Category> {
        let path = format!("/api/categories/{id}/modify");
        Self::execute(self.request(Method::PATCH, &path).json(patch)).await
    }

    #[tracing::instrument(skip_all, fields(count = ids.len()))]
    async fn delete_categories(&self, ids: &[CategoryId]) -> Result<Vec<Category>> {
        let body: Vec<CategoryRef> = ids.iter().map(|&id| CategoryRef { id }).collect();
        Self::execute(self.request(Method::DELETE, DELETE_CATEGORIES_PATH).json(&body)).await
    }

    #[tracing::instrument(skip_all)]
    async fn user_entities(&self) -> Result<UserEntities> {
        Self::execute(self.request(Method::GET, USER_ENTITIES_PATH)).await
    }

    #[tracing::instrument(skip_all)]
    async fn session_entities(&self) -> Result<SessionEntities> {
        Self::execute(self.request(Method::GET, SESSION_ENTITIES_PATH)).await
    }

    #[tracing::instrument(skip_all, fields(user = %user))]
    async fn monthly_summary(&self, user: UserId) -> Result<Vec<MonthlySaldo>> {
        let path = format!("/api/users/{user}/monthly");
        Self::execute(self.request(Method::GET, &path)).await
    }

    #[tracing::instrument(skip_all, fields(files = files.len()))]
    async fn upload_statements(&self, files: Vec<StatementFile>) -> Result<UploadReport> {
        let form = files.into_iter().fold(Form::new(), |form, file| {
            let part = Part::bytes(file.contents).file_name(file.file_name);
            form.part(file.bank, part)
        });
        let response = self
            .request(Method::POST, UPLOAD_PATH)
            .multipart(form)
            .send()
            .await?;

        let code = response.status().as_u16();
        let Some(status) = UploadStatus::from_status(code) else {
            let _response = Self::check_status(response).await?;
            return Err(LedgerError::Api {
                status: code,
                message: "unexpected upload status".to_owned(),
            });
        };
        let body = response.text().await?;
        let outcome: UploadOutcome = serde_json::from_str(&body)?;
        tracing::debug!(
            status = ?status,
            imported = outcome.amount,
            failed = outcome.failed.len(),
            "upload finished"
        );
        Ok(UploadReport { status, outcome })
    }

    #[tracing::instrument(skip_all, fields(user = %user))]
    async fn modify_user(&self, user: UserId, patch: &UserPatch) -> Result<UserRecord> {
        let path = format!("/api/users/{user}/modify");
        Self::execute(self.request(Method::PATCH, &path).json(patch)).await
    }

    #[tracing::instrument(skip_all, fields(user = %user))]
    async fn change_password(&self, user: UserId, change: &PasswordChange) -> Result<()> {
        let path = format!("/api/users/{user}/change_password");
        Self::execute_unit(self.request(Method::PATCH, &path).json(change)).await
    }

    #[tracing::instrument(skip_all, fields(user = %user))]
    async fn delete_user(&self, user: UserId) -> Result<()> {
        let path = format!("/api/users/{user}/delete");
        Self::execute_unit(self.request(Method::DELETE, &path)).await
    }
}
