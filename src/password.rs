//! Password hashing and verification.
//!
//! Argon2id with a fresh random salt per call, so identical passwords never
//! produce identical hashes. Verification fails closed: a malformed stored
//! hash or an internal error reads the same as a wrong password.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher as _, PasswordVerifier};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Hash a plaintext password into a PHC-format string for storage.
    pub fn hash(&self, password: &SecretString) -> Result<String, Error> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| Error::PasswordHash(err.to_string()))
    }

    /// Verify a plaintext password against a stored hash.
    #[must_use]
    pub fn verify(&self, password: &SecretString, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok()
    }
}
