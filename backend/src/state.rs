use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::Config,
    db::redis::RedisPool,
    repositories::{
        identity::PgIdentityRepository, provider::PgProviderConfigRepository,
        session::PgSessionRepository, token::PgTokenLedger, user::PgUserRepository,
        user::UserRepository,
    },
    services::{
        audit::{AuditSink, TracingAuditSink},
        cache::{Cache, RedisCache},
        session_authority::SessionAuthority,
        session_store::SessionStore,
        sso::SsoOrchestrator,
    },
    utils::{jwt::TokenIssuer, vault::CryptoVault},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub cache: Arc<dyn Cache>,
    pub users: Arc<dyn UserRepository>,
    pub authority: SessionAuthority,
    pub sso: SsoOrchestrator,
    pub audit: Arc<dyn AuditSink>,
}

impl AppState {
    /// Wires the explicitly constructed collaborators together. All
    /// backends are injected so tests can substitute in-memory fakes.
    pub fn build(config: Config, pool: PgPool, redis: RedisPool) -> anyhow::Result<Self> {
        let vault = Arc::new(
            CryptoVault::new(&config.encryption_key)
                .map_err(|e| anyhow::anyhow!("vault init failed: {:?}", e))?,
        );
        let cache: Arc<dyn Cache> = Arc::new(RedisCache::new(redis));
        let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
        let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));

        let issuer = TokenIssuer::from_config(&config);
        let store = SessionStore::from_config(
            cache.clone(),
            Arc::new(PgSessionRepository::new(pool.clone())),
            &config,
        );
        let authority = SessionAuthority::new(
            issuer,
            store,
            Arc::new(PgTokenLedger::new(pool.clone())),
            audit.clone(),
        );

        let sso = SsoOrchestrator::new(
            vault,
            reqwest::Client::new(),
            Arc::new(PgProviderConfigRepository::new(pool.clone())),
            Arc::new(PgIdentityRepository::new(pool.clone())),
            users.clone(),
            config.sso_callback_url.clone(),
        );

        Ok(Self {
            pool,
            config,
            cache,
            users,
            authority,
            sso,
            audit,
        })
    }
}
