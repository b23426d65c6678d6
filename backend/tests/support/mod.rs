#![allow(dead_code)]

//! In-memory fakes for the cache and durable backends, letting the
//! store/authority/SSO suites run without external services.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use keygate_backend::error::AppError;
use keygate_backend::models::identity::UserIdentity;
use keygate_backend::models::session::{Session, SessionUpdate};
use keygate_backend::models::user::User;
use keygate_backend::repositories::identity::{IdentityRefresh, IdentityRepository, NewIdentity};
use keygate_backend::repositories::provider::{ProviderConfigRepository, TenantProvider};
use keygate_backend::repositories::session::SessionRepository;
use keygate_backend::repositories::token::TokenLedger;
use keygate_backend::repositories::user::{NewFederatedUser, UserRepository};
use keygate_backend::services::audit::{AuditEvent, AuditSink};
use keygate_backend::services::cache::Cache;
use keygate_backend::services::session_authority::SessionAuthority;
use keygate_backend::services::session_store::SessionStore;
use keygate_backend::utils::jwt::{TokenIssuer, TokenKind};

pub const SESSION_PREFIX: &str = "sso:session:";
pub const TOKEN_PREFIX: &str = "sso:token:";
pub const SESSION_TTL: u64 = 3600;

// ---------------------------------------------------------------- cache

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Option<DateTime<Utc>>)>>,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn live(&self, key: &str) -> Option<(String, Option<DateTime<Utc>>)> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.get(key).cloned()?;
        if let Some(expiry) = entry.1 {
            if expiry <= Utc::now() {
                entries.remove(key);
                return None;
            }
        }
        Some(entry)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.live(key).map(|(value, _)| value))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> anyhow::Result<()> {
        let expiry = Utc::now() + Duration::seconds(ttl_seconds as i64);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), Some(expiry)));
        Ok(())
    }

    async fn del(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> anyhow::Result<Option<String>> {
        let live = self.live(key);
        self.entries.lock().unwrap().remove(key);
        Ok(live.map(|(value, _)| value))
    }

    async fn ttl(&self, key: &str) -> anyhow::Result<Option<u64>> {
        Ok(self.live(key).and_then(|(_, expiry)| {
            expiry.map(|e| (e - Utc::now()).num_seconds().max(0) as u64)
        }))
    }

    async fn scan_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let keys: Vec<String> = self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        Ok(keys)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

// ------------------------------------------------------------- sessions

#[derive(Default)]
pub struct MemorySessionRepository {
    rows: Mutex<HashMap<String, Session>>,
}

impl MemorySessionRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seeds a durable row directly, bypassing the store.
    pub fn seed(&self, session: Session) {
        self.rows
            .lock()
            .unwrap()
            .insert(session.session_id.clone(), session);
    }

    pub fn row(&self, session_id: &str) -> Option<Session> {
        self.rows.lock().unwrap().get(session_id).cloned()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn insert(&self, session: &Session) -> Result<(), AppError> {
        self.rows
            .lock()
            .unwrap()
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        Ok(self.rows.lock().unwrap().get(session_id).cloned())
    }

    async fn update(
        &self,
        session_id: &str,
        update: &SessionUpdate,
        last_active: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(session) = rows.get_mut(session_id) {
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
            session.last_active = last_active;
        }
        Ok(())
    }

    async fn mark_inactive(&self, session_id: &str) -> Result<(), AppError> {
        if let Some(session) = self.rows.lock().unwrap().get_mut(session_id) {
            session.is_active = false;
        }
        Ok(())
    }

    async fn list_active_for_user(&self, user_id: &str) -> Result<Vec<Session>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.user_id == user_id && s.is_active)
            .cloned()
            .collect())
    }

    async fn mark_all_inactive_for_user(&self, user_id: &str) -> Result<(), AppError> {
        for session in self.rows.lock().unwrap().values_mut() {
            if session.user_id == user_id {
                session.is_active = false;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------- users

#[derive(Default)]
pub struct MemoryUserRepository {
    rows: Mutex<HashMap<String, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, user: User) {
        self.rows.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn row(&self, user_id: &str) -> Option<User> {
        self.rows.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.rows.lock().unwrap().get(user_id).cloned())
    }

    async fn find_active_by_email(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|u| u.tenant_id == tenant_id && u.email == email && u.is_active)
            .cloned())
    }

    async fn create_federated(&self, attrs: &NewFederatedUser) -> Result<User, AppError> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            tenant_id: attrs.tenant_id.clone(),
            email: attrs.email.clone(),
            name: Some(attrs.name.clone()),
            avatar: attrs.avatar.clone(),
            password_hash: None,
            email_verified: true,
            is_active: true,
            metadata: Some(attrs.metadata.clone()),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        self.rows
            .lock()
            .unwrap()
            .insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn touch_last_login(&self, user_id: &str) -> Result<(), AppError> {
        if let Some(user) = self.rows.lock().unwrap().get_mut(user_id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }
}

// ------------------------------------------------------------ identities

#[derive(Default)]
pub struct MemoryIdentityRepository {
    rows: Mutex<Vec<UserIdentity>>,
}

impl MemoryIdentityRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<UserIdentity> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityRepository for MemoryIdentityRepository {
    async fn find_by_subject(
        &self,
        provider: &str,
        provider_subject: &str,
    ) -> Result<Option<UserIdentity>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.provider == provider && i.provider_subject == provider_subject)
            .cloned())
    }

    async fn insert(&self, identity: &NewIdentity) -> Result<UserIdentity, AppError> {
        let now = Utc::now();
        let row = UserIdentity {
            id: Uuid::new_v4().to_string(),
            user_id: identity.user_id.clone(),
            provider: identity.provider.clone(),
            provider_subject: identity.provider_subject.clone(),
            profile: identity.profile.clone(),
            access_token_sealed: identity.access_token_sealed.clone(),
            refresh_token_sealed: identity.refresh_token_sealed.clone(),
            token_expires_at: identity.token_expires_at,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn refresh_snapshot(
        &self,
        identity_id: &str,
        refresh: &IdentityRefresh,
    ) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(identity) = rows.iter_mut().find(|i| i.id == identity_id) {
            identity.profile = refresh.profile.clone();
            identity.access_token_sealed = Some(refresh.access_token_sealed.clone());
            identity.token_expires_at = refresh.token_expires_at;
            identity.updated_at = Utc::now();
        }
        Ok(())
    }
}

// ------------------------------------------------------------- providers

#[derive(Default)]
pub struct MemoryProviderRepository {
    rows: Mutex<HashMap<(String, String), TenantProvider>>,
}

impl MemoryProviderRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, tenant_id: &str, provider_id: &str, entry: TenantProvider) {
        self.rows
            .lock()
            .unwrap()
            .insert((tenant_id.to_string(), provider_id.to_string()), entry);
    }
}

#[async_trait]
impl ProviderConfigRepository for MemoryProviderRepository {
    async fn find_active(
        &self,
        tenant_id: &str,
        provider_id: &str,
    ) -> Result<Option<TenantProvider>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(tenant_id.to_string(), provider_id.to_string()))
            .filter(|entry| entry.provider.is_active && entry.config.is_active)
            .cloned())
    }
}

// ----------------------------------------------------- ledger and audit

#[derive(Default)]
pub struct RecordingTokenLedger {
    pub issued: Mutex<Vec<(String, String)>>,
    pub revoked_users: Mutex<Vec<String>>,
}

impl RecordingTokenLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl TokenLedger for RecordingTokenLedger {
    async fn record(
        &self,
        _token: &str,
        kind: TokenKind,
        user_id: &str,
        _session_id: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.issued
            .lock()
            .unwrap()
            .push((kind.as_str().to_string(), user_id.to_string()));
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: &str) -> Result<(), AppError> {
        self.revoked_users.lock().unwrap().push(user_id.to_string());
        Ok(())
    }
}

pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn record(&self, _event: AuditEvent) {}
}

// --------------------------------------------------------------- wiring

pub struct StoreHarness {
    pub cache: Arc<MemoryCache>,
    pub sessions: Arc<MemorySessionRepository>,
    pub store: SessionStore,
}

pub fn build_store() -> StoreHarness {
    let cache = MemoryCache::new();
    let sessions = MemorySessionRepository::new();
    let store = SessionStore::new(
        cache.clone(),
        sessions.clone(),
        SESSION_PREFIX.to_string(),
        TOKEN_PREFIX.to_string(),
        SESSION_TTL,
    );
    StoreHarness {
        cache,
        sessions,
        store,
    }
}

pub struct AuthorityHarness {
    pub cache: Arc<MemoryCache>,
    pub sessions: Arc<MemorySessionRepository>,
    pub ledger: Arc<RecordingTokenLedger>,
    pub issuer: TokenIssuer,
    pub authority: SessionAuthority,
}

pub fn build_authority() -> AuthorityHarness {
    let StoreHarness {
        cache,
        sessions,
        store,
    } = build_store();
    let ledger = RecordingTokenLedger::new();
    let issuer = TokenIssuer::new("testsecret".into(), SESSION_TTL, 2_592_000, SESSION_TTL);
    let authority = SessionAuthority::new(
        issuer.clone(),
        store,
        ledger.clone(),
        Arc::new(NullAuditSink),
    );
    AuthorityHarness {
        cache,
        sessions,
        ledger,
        issuer,
        authority,
    }
}

pub fn sample_session(session_id: &str, user_id: &str, expires_in: i64) -> Session {
    let now = Utc::now();
    Session {
        session_id: session_id.to_string(),
        tenant_id: "acme".to_string(),
        user_id: user_id.to_string(),
        app_id: None,
        ip_address: None,
        user_agent: None,
        device_info: None,
        location: None,
        created_at: now,
        expires_at: now + Duration::seconds(expires_in),
        last_active: now,
        is_active: true,
    }
}
