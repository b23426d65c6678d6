use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Link between a local user and an external provider account.
/// Keyed exclusively on (provider, provider_subject), never on email,
/// so two external accounts sharing an address are never merged.
pub struct UserIdentity {
    pub id: String,
    pub user_id: String,
    /// Canonical provider key, e.g. `google`.
    pub provider: String,
    /// Provider-assigned subject identifier.
    pub provider_subject: String,
    /// Raw user-info payload from the last successful login.
    pub profile: Value,
    /// Sealed federated access token, refreshed on every SSO login.
    #[serde(skip_serializing)]
    pub access_token_sealed: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token_sealed: Option<String>,
    /// Estimated expiry of the sealed refresh token.
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
