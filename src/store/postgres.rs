//! `PostgreSQL`-backed credential store.
//!
//! Schema lives in `migrations/`. Upserts rely on the `UNIQUE (user_id)`
//! constraints on `sessions` and `password_resets`; consume is a single
//! statement so two concurrent consumes of the same token can never both
//! succeed.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{ConsumeResetOutcome, CredentialStore, InsertUserOutcome, UserRecord};
use crate::error::StoreError;

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<InsertUserOutcome, StoreError> {
        let query = r"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match row {
            Ok(row) => Ok(InsertUserOutcome::Created(UserRecord {
                id: row.get("id"),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            })),
            Err(err) if is_unique_violation(&err) => Ok(InsertUserOutcome::EmailTaken),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert user")
                .into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let query = r"
            SELECT id, email, password_hash
            FROM users
            WHERE email = $1
        ";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup user by email")?;

        Ok(row.map(|row| UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let query = r"
            UPDATE users
            SET password_hash = $2
            WHERE id = $1
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update password hash")?;
        Ok(())
    }

    async fn upsert_session(&self, user_id: Uuid, token_hash: &str) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO sessions (user_id, token_hash)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET token_hash = $2
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to upsert session")?;
        Ok(())
    }

    async fn find_session_user(&self, token_hash: &str) -> Result<Option<UserRecord>, StoreError> {
        let query = r"
            SELECT users.id, users.email, users.password_hash
            FROM sessions
            JOIN users ON users.id = sessions.user_id
            WHERE sessions.token_hash = $1
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), StoreError> {
        // Idempotent; deleting an absent session is not an error.
        let query = r"
            DELETE FROM sessions
            WHERE token_hash = $1
        ";
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete session")?;
        Ok(())
    }

    async fn upsert_password_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO password_resets (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET token_hash = $2, expires_at = $3
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to upsert password reset")?;
        Ok(())
    }

    async fn consume_password_reset(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeResetOutcome, StoreError> {
        // One statement: the conditional delete and the expiry check share a
        // snapshot, so a concurrent consume sees `consumed = false` and maps
        // to NotFound instead of a second success.
        let query = r"
            WITH candidate AS (
                SELECT password_resets.id, password_resets.expires_at,
                       users.id AS user_id, users.email, users.password_hash
                FROM password_resets
                JOIN users ON users.id = password_resets.user_id
                WHERE password_resets.token_hash = $1
            ),
            deleted AS (
                DELETE FROM password_resets
                WHERE id IN (SELECT id FROM candidate WHERE expires_at > $2)
                RETURNING id
            )
            SELECT candidate.user_id, candidate.email, candidate.password_hash,
                   candidate.expires_at,
                   deleted.id IS NOT NULL AS consumed
            FROM candidate
            LEFT JOIN deleted ON deleted.id = candidate.id
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to consume password reset")?;

        let Some(row) = row else {
            return Ok(ConsumeResetOutcome::NotFound);
        };

        if row.get::<bool, _>("consumed") {
            return Ok(ConsumeResetOutcome::Consumed(UserRecord {
                id: row.get("user_id"),
                email: row.get("email"),
                password_hash: row.get("password_hash"),
            }));
        }

        let expires_at: DateTime<Utc> = row.get("expires_at");
        if expires_at <= now {
            Ok(ConsumeResetOutcome::Expired)
        } else {
            // Valid but not deleted: a concurrent consume won the race.
            Ok(ConsumeResetOutcome::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::is_unique_violation;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }
}
