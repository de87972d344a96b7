//! Password-reset tokens: issuance and single-use consumption.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::store::{ConsumeResetOutcome, CredentialStore};
use crate::token::{self, TokenPurpose, MIN_TOKEN_BYTES};
use crate::users::{normalize_email, User};

const DEFAULT_TTL_SECONDS: i64 = 60 * 60;

/// A freshly issued reset request. `token` is the raw value for the emailed
/// link and is never persisted.
#[derive(Debug)]
pub struct PasswordReset {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct PasswordResetManager {
    store: Arc<dyn CredentialStore>,
    token_bytes: usize,
    ttl: Duration,
}

impl PasswordResetManager {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            token_bytes: MIN_TOKEN_BYTES,
            ttl: Duration::seconds(DEFAULT_TTL_SECONDS),
        }
    }

    /// Entropy per token; values below the 32-byte minimum are raised to it.
    #[must_use]
    pub fn with_token_bytes(mut self, bytes: usize) -> Self {
        self.token_bytes = bytes;
        self
    }

    /// Validity window for issued tokens. Non-positive durations fall back
    /// to the 1-hour default.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = if ttl > Duration::zero() {
            ttl
        } else {
            Duration::seconds(DEFAULT_TTL_SECONDS)
        };
        self
    }

    /// Issue a reset token for the account owning `email`, replacing any
    /// outstanding request for that user.
    ///
    /// Fails with [`Error::InvalidUser`] when no account matches; whether
    /// that is surfaced or hidden from the requester (anti-enumeration) is
    /// the caller's decision.
    pub async fn create(&self, email: &str) -> Result<PasswordReset, Error> {
        let email = normalize_email(email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await
            .map_err(|err| Error::store("user lookup", err))?
            .ok_or(Error::InvalidUser)?;

        let raw_token = token::generate(self.token_bytes)?;
        let token_hash = token::digest(TokenPurpose::PasswordReset, &raw_token);
        let expires_at = Utc::now() + self.ttl;

        self.store
            .upsert_password_reset(user.id, &token_hash, expires_at)
            .await
            .map_err(|err| Error::store("password reset upsert", err))?;
        debug!(user_id = %user.id, %expires_at, "password reset issued");

        Ok(PasswordReset {
            user_id: user.id,
            token: raw_token,
            expires_at,
        })
    }

    /// Consume a reset token, at most once, and return the owning user.
    ///
    /// Expiry check, deletion, and user resolution happen in one atomic
    /// store operation: of two concurrent calls with the same valid token,
    /// exactly one succeeds and the other sees [`Error::TokenNotFound`].
    /// Expired records are rejected with [`Error::TokenExpired`] and left in
    /// place; deletion is reserved for the success path.
    pub async fn consume(&self, raw_token: &str) -> Result<User, Error> {
        let token_hash = token::digest(TokenPurpose::PasswordReset, raw_token);
        let outcome = self
            .store
            .consume_password_reset(&token_hash, Utc::now())
            .await
            .map_err(|err| Error::store("password reset consume", err))?;
        match outcome {
            ConsumeResetOutcome::Consumed(record) => {
                debug!(user_id = %record.id, "password reset consumed");
                Ok(record.into())
            }
            ConsumeResetOutcome::Expired => Err(Error::TokenExpired),
            ConsumeResetOutcome::NotFound => Err(Error::TokenNotFound),
        }
    }
}
