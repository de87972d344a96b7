//! Session issuance, resolution, and revocation.
//!
//! Sessions have no independent TTL: a session dies when it is replaced by
//! a newer login for the same user or explicitly deleted. Logging in on a
//! second device therefore invalidates the first device's token immediately;
//! that single-active-session policy is deliberate.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::store::CredentialStore;
use crate::token::{self, TokenPurpose, MIN_TOKEN_BYTES};
use crate::users::User;

/// A freshly issued session. `token` is the raw value for the client-held
/// cookie; this is the only moment it exists outside the client.
#[derive(Debug)]
pub struct Session {
    pub user_id: Uuid,
    pub token: String,
}

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    token_bytes: usize,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            token_bytes: MIN_TOKEN_BYTES,
        }
    }

    /// Entropy per token; values below the 32-byte minimum are raised to it.
    #[must_use]
    pub fn with_token_bytes(mut self, bytes: usize) -> Self {
        self.token_bytes = bytes;
        self
    }

    /// Issue a session for `user_id`, replacing any existing one.
    pub async fn create(&self, user_id: Uuid) -> Result<Session, Error> {
        let raw_token = token::generate(self.token_bytes)?;
        let token_hash = token::digest(TokenPurpose::Session, &raw_token);
        self.store
            .upsert_session(user_id, &token_hash)
            .await
            .map_err(Error::SessionCreation)?;
        debug!(%user_id, "session created");
        Ok(Session {
            user_id,
            token: raw_token,
        })
    }

    /// Resolve a raw token to the authenticated user. Pure read; fails with
    /// [`Error::SessionNotFound`] whether the token was never issued or has
    /// been replaced.
    pub async fn resolve(&self, raw_token: &str) -> Result<User, Error> {
        let token_hash = token::digest(TokenPurpose::Session, raw_token);
        self.store
            .find_session_user(&token_hash)
            .await
            .map_err(|err| Error::store("session lookup", err))?
            .map(User::from)
            .ok_or(Error::SessionNotFound)
    }

    /// Delete the session for a raw token. Idempotent.
    pub async fn delete(&self, raw_token: &str) -> Result<(), Error> {
        let token_hash = token::digest(TokenPurpose::Session, raw_token);
        self.store
            .delete_session(&token_hash)
            .await
            .map_err(|err| Error::store("session delete", err))
    }
}
