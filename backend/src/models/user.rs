//! Models that represent user accounts and authentication payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a user account within a tenant.
pub struct User {
    /// Unique identifier for the user.
    pub id: String,
    /// Tenant the account belongs to.
    pub tenant_id: String,
    /// Login email, unique within the tenant.
    pub email: String,
    /// Human-readable display name.
    pub name: Option<String>,
    pub avatar: Option<String>,
    /// Argon2 hash of the user's password. Absent for accounts that
    /// only ever signed in through a federated provider.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    /// Raw profile snapshot captured at account creation.
    pub metadata: Option<Value>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// User fields safe to return to callers.
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            avatar: user.avatar,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    pub tenant_slug: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub client_id: String,
    #[validate(url)]
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SsoInitRequest {
    pub tenant_slug: String,
    pub provider_id: String,
    pub client_id: String,
    #[validate(url)]
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub tokens: crate::models::token::TokenSet,
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SsoInitResponse {
    pub auth_url: String,
    pub state: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SsoCallbackResponse {
    pub tokens: crate::models::token::TokenSet,
    pub user: UserResponse,
    pub is_new_user: bool,
}
