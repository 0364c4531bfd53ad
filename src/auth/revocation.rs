// Revocation list for refresh tokens, keyed by token id (jti)
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use thiserror::Error;

use crate::db::models::RevokedToken;
use crate::db::timestamp;
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum RevocationError {
    #[error("Token is blacklisted")]
    AlreadyRevoked,

    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Add a token to the list. Fails with `AlreadyRevoked` if it is there already.
    async fn revoke(&self, token: &RevokedToken) -> Result<(), RevocationError>;

    async fn is_revoked(&self, jti: &str) -> Result<bool, RevocationError>;

    /// Drop entries for tokens that expired before `now` (returns count deleted).
    /// An expired token fails verification anyway, so its entry is dead weight.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RevocationError>;
}

pub struct SqliteRevocationStore {
    pool: DbPool,
}

impl SqliteRevocationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for SqliteRevocationStore {
    async fn revoke(&self, token: &RevokedToken) -> Result<(), RevocationError> {
        let conn = self.pool.get()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO revoked_tokens (jti, user_id, expires_at, revoked_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![token.jti, token.user_id, token.expires_at, token.revoked_at],
        )?;

        if inserted == 0 {
            return Err(RevocationError::AlreadyRevoked);
        }
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, RevocationError> {
        let conn = self.pool.get()?;
        let revoked = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = ?1)",
            params![jti],
            |row| row.get(0),
        )?;
        Ok(revoked)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RevocationError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM revoked_tokens WHERE expires_at < ?1",
            params![timestamp(now)],
        )?;
        Ok(deleted as u64)
    }
}
