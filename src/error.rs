//! Error taxonomy for the credential core.
//!
//! Expected, user-facing kinds (`EmailTaken`, `InvalidUser`,
//! `InvalidPassword`, `TokenNotFound`, `TokenExpired`) are distinct variants
//! so the caller can pick its own messaging; infrastructure failures carry
//! their source chain and are never swallowed. Which kinds stay
//! distinguishable at the wire boundary is the caller's decision, not ours.

use thiserror::Error;

/// Failure inside a [`crate::store::CredentialStore`] implementation.
///
/// Carries the full `anyhow` context chain built by the implementation
/// (query name, driver error); managers wrap it with the operation that was
/// in flight.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct StoreError(#[from] anyhow::Error);

#[derive(Debug, Error)]
pub enum Error {
    /// The OS random source failed. Fatal for the request; never degrade to
    /// a non-secure source.
    #[error("random source unavailable")]
    Entropy(#[source] rand::Error),

    #[error("email address is already in use")]
    EmailTaken,

    #[error("email address is not valid")]
    InvalidEmail,

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("no account matches that email address")]
    InvalidUser,

    #[error("password does not match the stored credential")]
    InvalidPassword,

    /// Covers both "never issued" and "replaced by a newer login".
    #[error("session not found")]
    SessionNotFound,

    #[error("could not create a session")]
    SessionCreation(#[source] StoreError),

    #[error("password reset token not found")]
    TokenNotFound,

    #[error("password reset token has expired")]
    TokenExpired,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("credential store failure during {op}")]
    Store {
        op: &'static str,
        #[source]
        source: StoreError,
    },
}

impl Error {
    pub(crate) fn store(op: &'static str, source: StoreError) -> Self {
        Self::Store { op, source }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, StoreError};
    use anyhow::anyhow;

    #[test]
    fn store_error_keeps_operation_context() {
        let err = Error::store("user insert", StoreError::from(anyhow!("boom")));
        assert_eq!(
            err.to_string(),
            "credential store failure during user insert"
        );
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("boom"));
    }

    #[test]
    fn user_facing_kinds_have_stable_messages() {
        assert_eq!(
            Error::EmailTaken.to_string(),
            "email address is already in use"
        );
        assert_eq!(
            Error::TokenExpired.to_string(),
            "password reset token has expired"
        );
        assert_eq!(
            Error::WeakPassword { min: 8 }.to_string(),
            "password must be at least 8 characters"
        );
    }

    #[test]
    fn password_hash_failure_carries_detail() {
        let err = Error::PasswordHash("salt invalid: too short".to_string());
        assert_eq!(
            err.to_string(),
            "password hashing failed: salt invalid: too short"
        );
    }
}
