use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::provider::{SsoProvider, SsoProviderConfig};

/// A provider definition joined with a tenant's activation of it.
#[derive(Debug, Clone)]
pub struct TenantProvider {
    pub provider: SsoProvider,
    pub config: SsoProviderConfig,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderConfigRepository: Send + Sync {
    /// The active configuration for a (tenant, provider) pair, or
    /// `None` when either side is missing or inactive.
    async fn find_active(
        &self,
        tenant_id: &str,
        provider_id: &str,
    ) -> Result<Option<TenantProvider>, AppError>;
}

pub struct PgProviderConfigRepository {
    pool: PgPool,
}

impl PgProviderConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderConfigRepository for PgProviderConfigRepository {
    async fn find_active(
        &self,
        tenant_id: &str,
        provider_id: &str,
    ) -> Result<Option<TenantProvider>, AppError> {
        let config = sqlx::query_as::<_, SsoProviderConfig>(
            "SELECT id, tenant_id, provider_id, client_id, client_secret, scopes, \
             redirect_uri, mapping, is_active, created_at, updated_at \
             FROM sso_provider_configs \
             WHERE tenant_id = $1 AND provider_id = $2 AND is_active = TRUE",
        )
        .bind(tenant_id)
        .bind(provider_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(config) = config else {
            return Ok(None);
        };

        let provider = sqlx::query_as::<_, SsoProvider>(
            "SELECT id, name, kind, provider, auth_url, token_url, user_info_url, scopes, \
             is_global, is_active, created_at, updated_at \
             FROM sso_providers WHERE id = $1 AND is_active = TRUE",
        )
        .bind(&config.provider_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(provider.map(|provider| TenantProvider { provider, config }))
    }
}
