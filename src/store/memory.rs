//! Embedded credential store.
//!
//! Backs the test suite and small demos. All state sits behind one async
//! mutex, so every trait operation is atomic the same way a single SQL
//! statement is in the `PostgreSQL` implementation; consume in particular
//! holds the lock across the expiry check and the removal.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ConsumeResetOutcome, CredentialStore, InsertUserOutcome, UserRecord};
use crate::error::StoreError;

struct ResetRow {
    token_hash: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    // Keyed by user_id: at most one live session / reset per user.
    sessions: HashMap<Uuid, String>,
    resets: HashMap<Uuid, ResetRow>,
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<State>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<InsertUserOutcome, StoreError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|user| user.email == email) {
            return Ok(InsertUserOutcome::EmailTaken);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        state.users.insert(record.id, record.clone());
        Ok(InsertUserOutcome::Created(record))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn upsert_session(&self, user_id: Uuid, token_hash: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.sessions.insert(user_id, token_hash.to_string());
        Ok(())
    }

    async fn find_session_user(&self, token_hash: &str) -> Result<Option<UserRecord>, StoreError> {
        let state = self.state.lock().await;
        let user_id = state
            .sessions
            .iter()
            .find(|(_, hash)| hash.as_str() == token_hash)
            .map(|(user_id, _)| *user_id);
        Ok(user_id.and_then(|id| state.users.get(&id).cloned()))
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.sessions.retain(|_, hash| hash.as_str() != token_hash);
        Ok(())
    }

    async fn upsert_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.resets.insert(
            user_id,
            ResetRow {
                token_hash: token_hash.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn consume_password_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeResetOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let Some((user_id, expires_at)) = state
            .resets
            .iter()
            .find(|(_, row)| row.token_hash == token_hash)
            .map(|(user_id, row)| (*user_id, row.expires_at))
        else {
            return Ok(ConsumeResetOutcome::NotFound);
        };

        if expires_at <= now {
            // Left in place for the next create to overwrite.
            return Ok(ConsumeResetOutcome::Expired);
        }

        state.resets.remove(&user_id);
        match state.users.get(&user_id).cloned() {
            Some(user) => Ok(ConsumeResetOutcome::Consumed(user)),
            None => Ok(ConsumeResetOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryCredentialStore;
    use crate::store::{ConsumeResetOutcome, CredentialStore, InsertUserOutcome};
    use chrono::{Duration, Utc};

    async fn seeded_store() -> (MemoryCredentialStore, uuid::Uuid) {
        let store = MemoryCredentialStore::new();
        let outcome = store
            .insert_user("user@example.com", "hash")
            .await
            .expect("insert");
        let InsertUserOutcome::Created(record) = outcome else {
            panic!("expected created");
        };
        (store, record.id)
    }

    #[tokio::test]
    async fn session_upsert_replaces_previous_hash() {
        let (store, user_id) = seeded_store().await;
        store.upsert_session(user_id, "first").await.expect("upsert");
        store
            .upsert_session(user_id, "second")
            .await
            .expect("upsert");

        assert!(store
            .find_session_user("first")
            .await
            .expect("lookup")
            .is_none());
        assert!(store
            .find_session_user("second")
            .await
            .expect("lookup")
            .is_some());
    }

    #[tokio::test]
    async fn delete_session_is_idempotent() {
        let (store, user_id) = seeded_store().await;
        store.upsert_session(user_id, "hash").await.expect("upsert");
        store.delete_session("hash").await.expect("delete");
        store.delete_session("hash").await.expect("delete again");
        assert!(store
            .find_session_user("hash")
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn expired_reset_is_not_deleted() {
        let (store, user_id) = seeded_store().await;
        let now = Utc::now();
        store
            .upsert_password_reset(user_id, "hash", now - Duration::seconds(1))
            .await
            .expect("upsert");

        for _ in 0..2 {
            let outcome = store
                .consume_password_reset("hash", now)
                .await
                .expect("consume");
            assert!(matches!(outcome, ConsumeResetOutcome::Expired));
        }
    }

    #[tokio::test]
    async fn consume_removes_the_record() {
        let (store, user_id) = seeded_store().await;
        let now = Utc::now();
        store
            .upsert_password_reset(user_id, "hash", now + Duration::hours(1))
            .await
            .expect("upsert");

        let first = store
            .consume_password_reset("hash", now)
            .await
            .expect("consume");
        assert!(matches!(first, ConsumeResetOutcome::Consumed(_)));

        let second = store
            .consume_password_reset("hash", now)
            .await
            .expect("consume");
        assert!(matches!(second, ConsumeResetOutcome::NotFound));
    }
}
