use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::identity::UserIdentity;

/// Attributes for a federated identity created on first SSO login.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub user_id: String,
    pub provider: String,
    pub provider_subject: String,
    pub profile: Value,
    pub access_token_sealed: Option<String>,
    pub refresh_token_sealed: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Snapshot written back on every subsequent SSO login.
#[derive(Debug, Clone)]
pub struct IdentityRefresh {
    pub profile: Value,
    pub access_token_sealed: String,
    pub token_expires_at: Option<DateTime<Utc>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Lookup by the (provider, provider_subject) linking key.
    async fn find_by_subject(
        &self,
        provider: &str,
        provider_subject: &str,
    ) -> Result<Option<UserIdentity>, AppError>;

    async fn insert(&self, identity: &NewIdentity) -> Result<UserIdentity, AppError>;

    async fn refresh_snapshot(
        &self,
        identity_id: &str,
        refresh: &IdentityRefresh,
    ) -> Result<(), AppError>;
}

pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const IDENTITY_COLUMNS: &str = "id, user_id, provider, provider_subject, profile, \
     access_token_sealed, refresh_token_sealed, token_expires_at, created_at, updated_at";

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn find_by_subject(
        &self,
        provider: &str,
        provider_subject: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        let identity = sqlx::query_as::<_, UserIdentity>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM user_identities \
             WHERE provider = $1 AND provider_subject = $2"
        ))
        .bind(provider)
        .bind(provider_subject)
        .fetch_optional(&self.pool)
        .await?;
        Ok(identity)
    }

    async fn insert(&self, identity: &NewIdentity) -> Result<UserIdentity, AppError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, UserIdentity>(&format!(
            "INSERT INTO user_identities \
                 (id, user_id, provider, provider_subject, profile, \
                  access_token_sealed, refresh_token_sealed, token_expires_at, \
                  created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) \
             RETURNING {IDENTITY_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&identity.user_id)
        .bind(&identity.provider)
        .bind(&identity.provider_subject)
        .bind(&identity.profile)
        .bind(&identity.access_token_sealed)
        .bind(&identity.refresh_token_sealed)
        .bind(identity.token_expires_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn refresh_snapshot(
        &self,
        identity_id: &str,
        refresh: &IdentityRefresh,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE user_identities \
             SET profile = $1, access_token_sealed = $2, token_expires_at = $3, updated_at = $4 \
             WHERE id = $5",
        )
        .bind(&refresh.profile)
        .bind(&refresh.access_token_sealed)
        .bind(refresh.token_expires_at)
        .bind(Utc::now())
        .bind(identity_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
