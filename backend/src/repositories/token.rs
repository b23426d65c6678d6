//! Durable bookkeeping for issued tokens. This is revocation audit
//! state, not the validation fast path (that is the membership index);
//! only one-way fingerprints of credentials are stored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::utils::jwt::TokenKind;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenLedger: Send + Sync {
    async fn record(
        &self,
        token: &str,
        kind: TokenKind,
        user_id: &str,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Flag every live record for the user as revoked.
    async fn revoke_all_for_user(&self, user_id: &str) -> Result<(), AppError>;
}

pub struct PgTokenLedger {
    pool: PgPool,
}

impl PgTokenLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn fingerprint(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl TokenLedger for PgTokenLedger {
    async fn record(
        &self,
        token: &str,
        kind: TokenKind,
        user_id: &str,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO token_records \
                 (id, user_id, session_id, kind, fingerprint, expires_at, is_revoked, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(session_id)
        .bind(kind.as_str())
        .bind(Self::fingerprint(token))
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE token_records \
             SET is_revoked = TRUE, revoked_at = $1 \
             WHERE user_id = $2 AND is_revoked = FALSE",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
