use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::User;

/// Attributes for a user record created from a federated login.
#[derive(Debug, Clone)]
pub struct NewFederatedUser {
    pub tenant_id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub metadata: Value,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError>;

    async fn find_active_by_email(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<Option<User>, AppError>;

    /// Create an email-verified, passwordless account for a first-time
    /// federated login.
    async fn create_federated(&self, attrs: &NewFederatedUser) -> Result<User, AppError>;

    async fn touch_last_login(&self, user_id: &str) -> Result<(), AppError>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, tenant_id, email, name, avatar, password_hash, email_verified, \
     is_active, metadata, last_login_at, created_at, updated_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_active_by_email(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE tenant_id = $1 AND email = $2 AND is_active = TRUE"
        ))
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_federated(&self, attrs: &NewFederatedUser) -> Result<User, AppError> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users \
                 (id, tenant_id, email, name, avatar, password_hash, email_verified, \
                  is_active, metadata, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NULL, TRUE, TRUE, $6, $7, $7) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&attrs.tenant_id)
        .bind(&attrs.email)
        .bind(&attrs.name)
        .bind(&attrs.avatar)
        .bind(&attrs.metadata)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn touch_last_login(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = $1, updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
