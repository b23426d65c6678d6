//! Durable half of the dual-backed session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::session::{Session, SessionUpdate};

/// Durable session persistence. Records are flagged not-live on
/// logout/revocation, never physically deleted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<(), AppError>;

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>, AppError>;

    /// Merge the partial update and refresh `last_active`.
    async fn update(
        &self,
        session_id: &str,
        update: &SessionUpdate,
        last_active: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn mark_inactive(&self, session_id: &str) -> Result<(), AppError>;

    async fn list_active_for_user(&self, user_id: &str) -> Result<Vec<Session>, AppError>;

    async fn mark_all_inactive_for_user(&self, user_id: &str) -> Result<(), AppError>;
}

pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SESSION_COLUMNS: &str = "session_id, tenant_id, user_id, app_id, ip_address, user_agent, \
     device_info, location, created_at, expires_at, last_active, is_active";

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions
                (session_id, tenant_id, user_id, app_id, ip_address, user_agent,
                 device_info, location, created_at, expires_at, last_active, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.tenant_id)
        .bind(&session.user_id)
        .bind(&session.app_id)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(&session.device_info)
        .bind(&session.location)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.last_active)
        .bind(session.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn update(
        &self,
        session_id: &str,
        update: &SessionUpdate,
        last_active: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET ip_address = COALESCE($1, ip_address),
                user_agent = COALESCE($2, user_agent),
                device_info = COALESCE($3, device_info),
                location = COALESCE($4, location),
                last_active = $5
            WHERE session_id = $6
            "#,
        )
        .bind(&update.ip_address)
        .bind(&update.user_agent)
        .bind(&update.device_info)
        .bind(&update.location)
        .bind(last_active)
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_inactive(&self, session_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE sessions SET is_active = FALSE WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_active_for_user(&self, user_id: &str) -> Result<Vec<Session>, AppError> {
        let sessions = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = $1 AND is_active = TRUE"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn mark_all_inactive_for_user(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE sessions SET is_active = FALSE WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
