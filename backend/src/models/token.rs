use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::utils::jwt::TokenKind;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// The token-set shape returned by login, SSO callback, and refresh.
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: u64,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Entry in the token membership index: the fast-path record of which
/// issued tokens are still considered valid.
pub struct TokenMeta {
    pub user_id: String,
    pub session_id: String,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, FromRow)]
/// Durable bookkeeping row for an issued access/refresh token. Stores
/// a one-way fingerprint, never the raw credential.
pub struct TokenRecord {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub kind: String,
    pub fingerprint: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
