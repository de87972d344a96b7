//! # Seruro
//!
//! `seruro` is the credential and session lifecycle core of a web
//! application: password hashing and verification, opaque session-token
//! issuance and lookup, and time-bounded, single-use password-reset tokens.
//! It owns no HTTP surface; controllers wire its managers into whatever
//! framework serves the site.
//!
//! ## Tokens
//!
//! Every token handed to a client (session cookie, reset link) is a random
//! ≥32-byte value encoded URL-safe. Only its SHA-256 digest touches the
//! database; the raw value exists in memory and in the return value of the
//! call that minted it, nowhere else. Digests are scoped by purpose so a
//! session token can never be replayed as a reset token.
//!
//! ## Single live record per user
//!
//! Sessions and password-reset requests are upserted keyed by `user_id`:
//! logging in on a second device replaces the first device's session, and a
//! new reset request replaces any outstanding one. A reset token is consumed
//! at most once; consumption deletes the backing record atomically.
//!
//! ## Storage
//!
//! All durable state lives behind [`store::CredentialStore`]. The crate
//! ships a `PostgreSQL` implementation ([`store::PgCredentialStore`], see
//! the `migrations/` directory for the schema) and an embedded one
//! ([`store::MemoryCredentialStore`]) for tests.

pub mod config;
pub mod email;
pub mod error;
pub mod password;
pub mod reset;
pub mod session;
pub mod store;
pub mod token;
pub mod users;

pub use config::AuthConfig;
pub use error::{Error, StoreError};
pub use password::PasswordHasher;
pub use reset::{PasswordReset, PasswordResetManager};
pub use session::{Session, SessionManager};
pub use store::CredentialStore;
pub use users::{AuthenticationService, User};
