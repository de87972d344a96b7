//! Random token generation and one-way digests for storage lookup.
//!
//! Raw tokens are only ever returned to the caller; the database sees the
//! SHA-256 digest. The digest is keyless and cheap on purpose: session
//! validation runs on every request, so the slow adaptive hash is reserved
//! for passwords ([`crate::password`]).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Minimum entropy for any issued token, enforced even when a caller asks
/// for fewer bytes.
pub const MIN_TOKEN_BYTES: usize = 32;

/// Scopes a digest to the table it keys, so equal raw values stored for
/// different purposes can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Session,
    PasswordReset,
}

impl TokenPurpose {
    fn prefix(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::PasswordReset => "password-reset",
        }
    }
}

/// Generate a random URL-safe token with at least [`MIN_TOKEN_BYTES`] bytes
/// of entropy.
///
/// The value is safe to embed in a cookie or URL query parameter without
/// further escaping.
pub fn generate(bytes: usize) -> Result<String, Error> {
    let bytes = bytes.max(MIN_TOKEN_BYTES);
    let mut buf = vec![0u8; bytes];
    OsRng.try_fill_bytes(&mut buf).map_err(Error::Entropy)?;
    Ok(URL_SAFE_NO_PAD.encode(&buf))
}

/// Hash a raw token for storage or lookup. Deterministic and keyless; the
/// raw value is not recoverable from the digest.
#[must_use]
pub fn digest(purpose: TokenPurpose, raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(purpose.prefix().as_bytes());
    hasher.update(b":");
    hasher.update(raw.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::{digest, generate, TokenPurpose, MIN_TOKEN_BYTES};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    #[test]
    fn generate_enforces_minimum_entropy() {
        let token = generate(1).expect("token");
        let decoded = URL_SAFE_NO_PAD.decode(token.as_bytes()).expect("decode");
        assert_eq!(decoded.len(), MIN_TOKEN_BYTES);
    }

    #[test]
    fn generate_honors_larger_requests() {
        let token = generate(64).expect("token");
        let decoded = URL_SAFE_NO_PAD.decode(token.as_bytes()).expect("decode");
        assert_eq!(decoded.len(), 64);
    }

    #[test]
    fn generate_is_url_safe() {
        let token = generate(MIN_TOKEN_BYTES).expect("token");
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));
        assert!(!token.contains('='));
    }

    #[test]
    fn tokens_are_unique() {
        let first = generate(MIN_TOKEN_BYTES).expect("token");
        let second = generate(MIN_TOKEN_BYTES).expect("token");
        assert_ne!(first, second);
    }

    #[test]
    fn digest_is_deterministic() {
        let first = digest(TokenPurpose::Session, "token");
        let second = digest(TokenPurpose::Session, "token");
        let other = digest(TokenPurpose::Session, "other");
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn digest_is_scoped_by_purpose() {
        let session = digest(TokenPurpose::Session, "token");
        let reset = digest(TokenPurpose::PasswordReset, "token");
        assert_ne!(session, reset);
    }

    #[test]
    fn digest_does_not_echo_the_raw_token() {
        let raw = generate(MIN_TOKEN_BYTES).expect("token");
        assert!(!digest(TokenPurpose::Session, &raw).contains(&raw));
    }
}
