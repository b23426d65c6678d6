//! Models for the dual-backed session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// A revocable login session. The cache copy is the fast path; the
/// durable row is the recovery path and is never physically deleted,
/// only flagged not-live.
pub struct Session {
    /// Opaque unique session token (UUIDv4).
    pub session_id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub app_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_info: Option<Value>,
    pub location: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Timestamp when the session was last used.
    pub last_active: DateTime<Utc>,
    /// Liveness flag. Logout and revocation clear it.
    pub is_active: bool,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Remaining lifetime in whole seconds, zero once expired.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> u64 {
        (self.expires_at - now).num_seconds().max(0) as u64
    }
}

#[derive(Debug, Clone, Default)]
/// Attributes supplied when opening a session.
pub struct NewSession {
    pub tenant_id: String,
    pub user_id: String,
    pub app_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_info: Option<Value>,
    pub location: Option<Value>,
}

#[derive(Debug, Clone, Default)]
/// Partial update merged into an existing session. `last_active` is
/// always refreshed regardless of which fields are present.
pub struct SessionUpdate {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_info: Option<Value>,
    pub location: Option<Value>,
}
