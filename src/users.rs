//! Account creation, authentication, and password updates.

use std::sync::Arc;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::password::PasswordHasher;
use crate::store::{CredentialStore, InsertUserOutcome, UserRecord};

/// An authenticated identity. The stored password hash never leaves the
/// crate API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
        }
    }
}

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// One step of the ordered sign-up check list. Checks run in order and
/// short-circuit on the first failure.
pub trait CredentialCheck: Send + Sync {
    fn check(&self, email: &str, password: &SecretString) -> Result<(), Error>;
}

/// Basic email format check on already-normalized input.
pub struct EmailFormat;

impl CredentialCheck for EmailFormat {
    fn check(&self, email: &str, _password: &SecretString) -> Result<(), Error> {
        let valid = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
            .is_ok_and(|regex| regex.is_match(email));
        if valid {
            Ok(())
        } else {
            Err(Error::InvalidEmail)
        }
    }
}

pub struct PasswordLength {
    pub min: usize,
}

impl CredentialCheck for PasswordLength {
    fn check(&self, _email: &str, password: &SecretString) -> Result<(), Error> {
        if password.expose_secret().chars().count() < self.min {
            return Err(Error::WeakPassword { min: self.min });
        }
        Ok(())
    }
}

pub struct AuthenticationService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    checks: Vec<Box<dyn CredentialCheck>>,
}

impl AuthenticationService {
    /// Construct with the default check list: email format and an 8-character
    /// password minimum.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            hasher: PasswordHasher,
            checks: vec![Box::new(EmailFormat), Box::new(PasswordLength { min: 8 })],
        }
    }

    /// Replace the check list.
    #[must_use]
    pub fn with_checks(mut self, checks: Vec<Box<dyn CredentialCheck>>) -> Self {
        self.checks = checks;
        self
    }

    /// Append a check after the existing ones.
    #[must_use]
    pub fn with_check(mut self, check: Box<dyn CredentialCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Create an account. Fails with [`Error::EmailTaken`] when the store's
    /// unique-email constraint fires; the store is the uniqueness authority,
    /// so concurrent sign-ups with the same email cannot race past an
    /// in-memory check.
    pub async fn create(&self, email: &str, password: &SecretString) -> Result<User, Error> {
        let email = normalize_email(email);
        for check in &self.checks {
            check.check(&email, password)?;
        }
        let password_hash = self.hasher.hash(password)?;
        let outcome = self
            .store
            .insert_user(&email, &password_hash)
            .await
            .map_err(|err| Error::store("user insert", err))?;
        match outcome {
            InsertUserOutcome::Created(record) => {
                debug!(user_id = %record.id, "user created");
                Ok(record.into())
            }
            InsertUserOutcome::EmailTaken => Err(Error::EmailTaken),
        }
    }

    /// Authenticate an email/password pair.
    ///
    /// [`Error::InvalidUser`] and [`Error::InvalidPassword`] are distinct
    /// here for the direct caller's messaging; collapsing them into an
    /// opaque "sign-in failed" at the wire boundary is the caller's job.
    pub async fn authenticate(&self, email: &str, password: &SecretString) -> Result<User, Error> {
        let email = normalize_email(email);
        let record = self
            .store
            .find_user_by_email(&email)
            .await
            .map_err(|err| Error::store("user lookup", err))?
            .ok_or(Error::InvalidUser)?;
        if !self.hasher.verify(password, &record.password_hash) {
            return Err(Error::InvalidPassword);
        }
        Ok(record.into())
    }

    /// Re-hash and overwrite the stored password.
    ///
    /// Does not revoke existing sessions; the password-reset caller decides
    /// whether to mint a fresh session afterward (which replaces any live
    /// one).
    pub async fn update_password(
        &self,
        user_id: Uuid,
        new_password: &SecretString,
    ) -> Result<(), Error> {
        let password_hash = self.hasher.hash(new_password)?;
        self.store
            .update_password_hash(user_id, &password_hash)
            .await
            .map_err(|err| Error::store("password update", err))?;
        debug!(%user_id, "password updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, CredentialCheck, EmailFormat, PasswordLength};
    use crate::error::Error;
    use secrecy::SecretString;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn user_serializes_to_json() {
        let user = super::User {
            id: uuid::Uuid::nil(),
            email: "user@example.com".to_string(),
        };
        let json = serde_json::to_value(&user).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "email": "user@example.com",
            })
        );
    }

    #[test]
    fn email_format_accepts_basic_addresses() {
        let check = EmailFormat;
        assert!(check.check("a@example.com", &secret("password")).is_ok());
        assert!(check
            .check("name.surname@example.co", &secret("password"))
            .is_ok());
    }

    #[test]
    fn email_format_rejects_missing_parts() {
        let check = EmailFormat;
        for email in ["not-an-email", "missing-at.example.com", "missing-domain@"] {
            assert!(matches!(
                check.check(email, &secret("password")),
                Err(Error::InvalidEmail)
            ));
        }
    }

    #[test]
    fn password_length_enforces_minimum() {
        let check = PasswordLength { min: 8 };
        assert!(matches!(
            check.check("a@example.com", &secret("short")),
            Err(Error::WeakPassword { min: 8 })
        ));
        assert!(check.check("a@example.com", &secret("long enough")).is_ok());
    }
}
