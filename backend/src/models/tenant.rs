use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// An isolated organization boundary. All users, apps, and sessions
/// are scoped to one tenant.
pub struct Tenant {
    pub id: String,
    /// URL-safe identifier presented by clients (e.g. `acme`).
    pub slug: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
