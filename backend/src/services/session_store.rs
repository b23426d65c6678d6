//! Dual-backed session and token-membership storage: cache-first
//! reads with durable fallback, dual writes with the durable copy
//! authoritative.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::session::{NewSession, Session, SessionUpdate};
use crate::models::token::TokenMeta;
use crate::repositories::session::SessionRepository;
use crate::services::cache::Cache;

#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<dyn Cache>,
    sessions: Arc<dyn SessionRepository>,
    session_prefix: String,
    token_prefix: String,
    /// Lifetime of a new session in seconds.
    session_ttl: u64,
}

impl SessionStore {
    pub fn new(
        cache: Arc<dyn Cache>,
        sessions: Arc<dyn SessionRepository>,
        session_prefix: String,
        token_prefix: String,
        session_ttl: u64,
    ) -> Self {
        Self {
            cache,
            sessions,
            session_prefix,
            token_prefix,
            session_ttl,
        }
    }

    pub fn from_config(
        cache: Arc<dyn Cache>,
        sessions: Arc<dyn SessionRepository>,
        config: &Config,
    ) -> Self {
        Self::new(
            cache,
            sessions,
            config.redis_session_prefix.clone(),
            config.redis_token_prefix.clone(),
            config.access_token_expiry,
        )
    }

    fn session_key(&self, session_id: &str) -> String {
        format!("{}{}", self.session_prefix, session_id)
    }

    fn token_key(&self, token: &str) -> String {
        format!("{}{}", self.token_prefix, token)
    }

    /// Opens a session: cache entry with TTL = session lifetime, then
    /// the authoritative durable row flagged live. A durable failure
    /// fails the whole operation and best-effort clears the cache
    /// entry; a cache failure alone is tolerated (the next read
    /// repairs it from the durable copy).
    pub async fn create_session(&self, attrs: NewSession) -> Result<Session, AppError> {
        let now = Utc::now();
        let session = Session {
            session_id: Uuid::new_v4().to_string(),
            tenant_id: attrs.tenant_id,
            user_id: attrs.user_id,
            app_id: attrs.app_id,
            ip_address: attrs.ip_address,
            user_agent: attrs.user_agent,
            device_info: attrs.device_info,
            location: attrs.location,
            created_at: now,
            expires_at: now + Duration::seconds(self.session_ttl as i64),
            last_active: now,
            is_active: true,
        };

        let key = self.session_key(&session.session_id);
        let payload = serde_json::to_string(&session)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize session: {}", e)))?;

        if let Err(e) = self.cache.set_ex(&key, &payload, self.session_ttl).await {
            tracing::warn!(session_id = %session.session_id, "Session cache write failed: {e:#}");
        }

        if let Err(e) = self.sessions.insert(&session).await {
            if let Err(cleanup) = self.cache.del(&key).await {
                tracing::warn!(session_id = %session.session_id, "Orphaned cache entry cleanup failed: {cleanup:#}");
            }
            return Err(e);
        }

        Ok(session)
    }

    /// Cache-first read with durable fallback. A durable hit that is
    /// live and unexpired repopulates the cache with the *remaining*
    /// TTL, so an evicted session is never treated as gone while its
    /// durable record says it should be active.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let key = self.session_key(session_id);

        match self.cache.get(&key).await {
            Ok(Some(payload)) => {
                if let Ok(session) = serde_json::from_str::<Session>(&payload) {
                    return Ok(Some(session));
                }
                tracing::warn!(session_id, "Discarding undecodable session cache entry");
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(session_id, "Session cache read failed: {e:#}");
            }
        }

        let Some(session) = self.sessions.find_by_id(session_id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if !session.is_active || session.is_expired(now) {
            return Ok(None);
        }

        let remaining = session.remaining_ttl(now);
        if remaining > 0 {
            let payload = serde_json::to_string(&session)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize session: {}", e)))?;
            if let Err(e) = self.cache.set_ex(&key, &payload, remaining).await {
                tracing::warn!(session_id, "Session cache repair failed: {e:#}");
            }
        }

        Ok(Some(session))
    }

    /// Merges partial fields into the cache copy (best-effort, no-op
    /// when absent) and the durable copy (authoritative). Always
    /// refreshes `last_active`.
    pub async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let key = self.session_key(session_id);

        let cached = match self.cache.get(&key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(session_id, "Session cache read failed: {e:#}");
                None
            }
        };
        if let Some(payload) = cached {
            if let Ok(mut session) = serde_json::from_str::<Session>(&payload) {
                if update.ip_address.is_some() {
                    session.ip_address = update.ip_address.clone();
                }
                if update.user_agent.is_some() {
                    session.user_agent = update.user_agent.clone();
                }
                if update.device_info.is_some() {
                    session.device_info = update.device_info.clone();
                }
                if update.location.is_some() {
                    session.location = update.location.clone();
                }
                session.last_active = now;

                let remaining = match self.cache.ttl(&key).await {
                    Ok(ttl) => ttl,
                    Err(_) => None,
                };
                if let Some(remaining) = remaining.filter(|ttl| *ttl > 0) {
                    let payload = serde_json::to_string(&session).map_err(|e| {
                        AppError::Internal(anyhow::anyhow!("serialize session: {}", e))
                    })?;
                    if let Err(e) = self.cache.set_ex(&key, &payload, remaining).await {
                        tracing::warn!(session_id, "Session cache update failed: {e:#}");
                    }
                }
            }
        }

        self.sessions.update(session_id, &update, now).await
    }

    /// Logout/revocation: the cache entry is removed, the durable row
    /// is flagged not-live and retained.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        let key = self.session_key(session_id);
        if let Err(e) = self.cache.del(&key).await {
            tracing::warn!(session_id, "Session cache delete failed: {e:#}");
        }
        self.sessions.mark_inactive(session_id).await
    }

    /// Mass revocation. Not atomic across the two backends: a
    /// concurrent read may still observe a session mid-flight; the
    /// next validation re-check observes the revoked state.
    pub async fn delete_all_sessions_for_user(&self, user_id: &str) -> Result<(), AppError> {
        let sessions = self.sessions.list_active_for_user(user_id).await?;
        for session in &sessions {
            let key = self.session_key(&session.session_id);
            if let Err(e) = self.cache.del(&key).await {
                tracing::warn!(session_id = %session.session_id, "Session cache delete failed: {e:#}");
            }
        }
        self.sessions.mark_all_inactive_for_user(user_id).await
    }

    // Token membership index.

    pub async fn put_token(
        &self,
        token: &str,
        meta: &TokenMeta,
        ttl_seconds: u64,
    ) -> Result<(), AppError> {
        let payload = serde_json::to_string(meta)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize token meta: {}", e)))?;
        self.cache
            .set_ex(&self.token_key(token), &payload, ttl_seconds)
            .await
            .map_err(AppError::Internal)
    }

    pub async fn get_token(&self, token: &str) -> Result<Option<TokenMeta>, AppError> {
        let payload = self
            .cache
            .get(&self.token_key(token))
            .await
            .map_err(AppError::Internal)?;
        Ok(payload.and_then(|p| serde_json::from_str(&p).ok()))
    }

    pub async fn drop_token(&self, token: &str) -> Result<(), AppError> {
        self.cache
            .del(&self.token_key(token))
            .await
            .map_err(AppError::Internal)
    }

    /// Atomically consumes an index entry: of two racing callers at
    /// most one observes the metadata.
    pub async fn take_token(&self, token: &str) -> Result<Option<TokenMeta>, AppError> {
        let payload = self
            .cache
            .take(&self.token_key(token))
            .await
            .map_err(AppError::Internal)?;
        Ok(payload.and_then(|p| serde_json::from_str(&p).ok()))
    }

    /// Scans the index namespace and removes entries for the user.
    /// Linear cost; runs only on explicit mass-revocation.
    pub async fn drop_all_tokens_for_user(&self, user_id: &str) -> Result<(), AppError> {
        let keys = self
            .cache
            .scan_prefix(&self.token_prefix)
            .await
            .map_err(AppError::Internal)?;

        for key in keys {
            let Some(payload) = self.cache.get(&key).await.map_err(AppError::Internal)? else {
                continue;
            };
            let Ok(meta) = serde_json::from_str::<TokenMeta>(&payload) else {
                continue;
            };
            if meta.user_id == user_id {
                if let Err(e) = self.cache.del(&key).await {
                    tracing::warn!(user_id, "Token index delete failed: {e:#}");
                }
            }
        }
        Ok(())
    }
}
