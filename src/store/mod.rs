//! Persistence boundary for users, sessions, and password resets.
//!
//! Managers hold an `Arc<dyn CredentialStore>` and nothing else durable;
//! every correctness guarantee of the crate reduces to the atomicity of the
//! individual store operations. Operations return closed outcome enums so
//! callers match on a tag instead of inspecting error shapes, and the store
//! remains the authority on uniqueness (unique email, one session and one
//! reset per user).

mod memory;
mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;

/// Row shape for a stored user. The password hash stays inside the crate;
/// the public [`crate::users::User`] type drops it.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

/// Outcome of inserting a user row.
#[derive(Debug)]
pub enum InsertUserOutcome {
    Created(UserRecord),
    /// The unique-email constraint fired. Reported as data, not as an error
    /// shape to sniff.
    EmailTaken,
}

/// Outcome of consuming a password-reset token.
#[derive(Debug)]
pub enum ConsumeResetOutcome {
    /// The record was deleted and the owning user resolved, all in one
    /// operation.
    Consumed(UserRecord),
    /// The record exists but is past `expires_at`. It is left in place for
    /// the next create to overwrite; the failure path mutates nothing.
    Expired,
    /// No record matches the digest, including the case where a concurrent
    /// consume won the race.
    NotFound,
}

/// Durable storage consumed by the managers.
///
/// Every mutation here must be a single atomic operation against the
/// backing store; implementations must not read-then-write across two round
/// trips.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user row. Email is already normalized by the caller; the
    /// store's unique constraint decides [`InsertUserOutcome::EmailTaken`].
    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<InsertUserOutcome, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError>;

    /// Insert-or-replace the session keyed by `user_id`. Replacing is the
    /// single-active-session policy, not an accident.
    async fn upsert_session(&self, user_id: Uuid, token_hash: &str) -> Result<(), StoreError>;

    /// Resolve a session digest to the owning user in one lookup. Pure read.
    async fn find_session_user(&self, token_hash: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Delete the session matching the digest. Idempotent.
    async fn delete_session(&self, token_hash: &str) -> Result<(), StoreError>;

    /// Insert-or-replace the outstanding reset request keyed by `user_id`.
    async fn upsert_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomically check expiry against `now`, delete on success, and resolve
    /// the owning user. Two concurrent calls with the same valid digest must
    /// yield exactly one [`ConsumeResetOutcome::Consumed`].
    async fn consume_password_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeResetOutcome, StoreError>;
}
