use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// A federated identity provider definition (endpoints and defaults).
pub struct SsoProvider {
    pub id: String,
    /// Display name, e.g. `Google`.
    pub name: String,
    /// Protocol family, e.g. `oauth2` or `oidc`.
    pub kind: String,
    /// Canonical provider key, e.g. `google`.
    pub provider: String,
    pub auth_url: String,
    pub token_url: String,
    pub user_info_url: Option<String>,
    /// Space-separated default scopes.
    pub scopes: String,
    pub is_global: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Tenant-scoped provider activation: client credentials and optional
/// overrides for one (tenant, provider) pair.
pub struct SsoProviderConfig {
    pub id: String,
    pub tenant_id: String,
    pub provider_id: String,
    pub client_id: String,
    /// Sealed client secret (`ct:iv:tag` hex envelope). Never stored
    /// in plaintext.
    #[serde(skip_serializing)]
    pub client_secret: String,
    /// Scope override; falls back to the provider's default scopes.
    pub scopes: Option<String>,
    pub redirect_uri: Option<String>,
    /// Canonical field name -> dot-path mapping for user-info
    /// normalization.
    pub mapping: Option<Value>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
