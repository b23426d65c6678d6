//! OAuth2 authorization-code orchestration: provider resolution with
//! secret unsealing, the code exchange, user-info normalization, and
//! reconciliation into a local identity.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use url::Url;

use crate::error::AppError;
use crate::repositories::identity::{IdentityRefresh, IdentityRepository, NewIdentity};
use crate::repositories::provider::ProviderConfigRepository;
use crate::repositories::user::{NewFederatedUser, UserRepository};
use crate::utils::vault::{CryptoVault, SealedSecret};

/// Lifetime assumed for a federated refresh token when the provider
/// does not say otherwise.
const REFRESH_TOKEN_LIFETIME_DAYS: i64 = 30;

/// Canonical field name -> dot-path lookup table for normalizing
/// provider user-info payloads. Each path falls back to the common
/// field name when it resolves to nothing.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            email: "email".to_string(),
            name: "name".to_string(),
            avatar: "picture".to_string(),
        }
    }
}

impl FieldMapping {
    /// Reads per-provider overrides from the stored mapping object.
    pub fn from_value(mapping: Option<&Value>) -> Self {
        let mut result = Self::default();
        let Some(mapping) = mapping else {
            return result;
        };
        if let Some(path) = mapping.get("id").and_then(Value::as_str) {
            result.id = path.to_string();
        }
        if let Some(path) = mapping.get("email").and_then(Value::as_str) {
            result.email = path.to_string();
        }
        if let Some(path) = mapping.get("name").and_then(Value::as_str) {
            result.name = path.to_string();
        }
        if let Some(path) = mapping.get("avatar").and_then(Value::as_str) {
            result.avatar = path.to_string();
        }
        result
    }

    /// Walks a dot-path through a structured value.
    fn resolve<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
        let mut current = data;
        for key in path.split('.') {
            current = current.get(key)?;
        }
        Some(current)
    }

    /// Mapped path first, then the common field name.
    fn lookup(data: &Value, path: &str, fallback_key: &str) -> Option<Value> {
        Self::resolve(data, path)
            .or_else(|| data.get(fallback_key))
            .filter(|v| !v.is_null())
            .cloned()
    }

    fn lookup_string(data: &Value, path: &str, fallback_key: &str) -> Option<String> {
        match Self::lookup(data, path, fallback_key)? {
            Value::String(s) => Some(s),
            // Some providers return numeric subject ids.
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Provider user-info normalized into the canonical shape.
#[derive(Debug, Clone)]
pub struct SsoUserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    /// The untouched provider payload.
    pub raw: Value,
}

/// A provider definition joined with a tenant's activation, secrets
/// unsealed, ready for use.
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    pub provider_key: String,
    pub name: String,
    pub auth_url: String,
    pub token_url: String,
    pub user_info_url: Option<String>,
    pub scopes: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
    pub mapping: FieldMapping,
}

#[derive(Debug, Clone)]
pub struct ReconciledIdentity {
    pub user_id: String,
    pub is_new_user: bool,
}

#[derive(Clone)]
pub struct SsoOrchestrator {
    vault: Arc<CryptoVault>,
    http: reqwest::Client,
    providers: Arc<dyn ProviderConfigRepository>,
    identities: Arc<dyn IdentityRepository>,
    users: Arc<dyn UserRepository>,
    /// Deployment-wide callback default when neither the caller nor
    /// the provider config supplies a redirect URI.
    callback_url: String,
}

impl SsoOrchestrator {
    pub fn new(
        vault: Arc<CryptoVault>,
        http: reqwest::Client,
        providers: Arc<dyn ProviderConfigRepository>,
        identities: Arc<dyn IdentityRepository>,
        users: Arc<dyn UserRepository>,
        callback_url: String,
    ) -> Self {
        Self {
            vault,
            http,
            providers,
            identities,
            users,
            callback_url,
        }
    }

    /// Loads the active (tenant, provider) configuration and unseals
    /// the client secret.
    pub async fn resolve_provider(
        &self,
        tenant_id: &str,
        provider_id: &str,
    ) -> Result<ResolvedProvider, AppError> {
        let Some(found) = self.providers.find_active(tenant_id, provider_id).await? else {
            return Err(AppError::NotFound(
                "SSO provider not found or inactive".to_string(),
            ));
        };

        let sealed = SealedSecret::from_str(&found.config.client_secret)?;
        let client_secret = self.vault.decrypt(&sealed)?;

        Ok(ResolvedProvider {
            provider_key: found.provider.provider,
            name: found.provider.name,
            auth_url: found.provider.auth_url,
            token_url: found.provider.token_url,
            user_info_url: found.provider.user_info_url,
            scopes: found.config.scopes.unwrap_or(found.provider.scopes),
            client_id: found.config.client_id,
            client_secret,
            redirect_uri: found.config.redirect_uri,
            mapping: FieldMapping::from_value(found.config.mapping.as_ref()),
        })
    }

    /// Composes the standard authorization-request query against the
    /// provider's authorize endpoint. `state` is an opaque passthrough
    /// the caller persists and validates against replay.
    pub async fn build_authorization_url(
        &self,
        tenant_id: &str,
        provider_id: &str,
        state: &str,
        redirect_uri: Option<&str>,
    ) -> Result<String, AppError> {
        let provider = self.resolve_provider(tenant_id, provider_id).await?;
        let redirect = self.effective_redirect(&provider, redirect_uri);

        let mut url = Url::parse(&provider.auth_url).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("invalid authorize endpoint: {}", e))
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &provider.client_id)
            .append_pair("redirect_uri", &redirect)
            .append_pair("response_type", "code")
            .append_pair("scope", &provider.scopes)
            .append_pair("state", state);

        Ok(url.to_string())
    }

    /// POSTs the authorization_code grant and returns the provider's
    /// raw token payload unmodified. Transport and non-2xx failures
    /// propagate; retries belong to the transport collaborator.
    pub async fn exchange_code(
        &self,
        tenant_id: &str,
        provider_id: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<Value, AppError> {
        let provider = self.resolve_provider(tenant_id, provider_id).await?;
        let redirect = self.effective_redirect(&provider, redirect_uri);

        let params = [
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&provider.token_url)
            .form(&params)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("token endpoint request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Upstream(format!("token endpoint returned junk: {}", e)))
    }

    /// Fetches the user-info document and normalizes it through the
    /// provider's field mapping.
    pub async fn fetch_user_info(
        &self,
        tenant_id: &str,
        provider_id: &str,
        access_token: &str,
    ) -> Result<SsoUserInfo, AppError> {
        let provider = self.resolve_provider(tenant_id, provider_id).await?;

        let Some(user_info_url) = provider.user_info_url else {
            return Err(AppError::NotFound(
                "User info endpoint not configured".to_string(),
            ));
        };

        let response = self
            .http
            .get(&user_info_url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("user info request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "user info endpoint returned {}",
                response.status()
            )));
        }

        let raw = response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Upstream(format!("user info endpoint returned junk: {}", e)))?;

        let mapping = &provider.mapping;
        let id = FieldMapping::lookup_string(&raw, &mapping.id, "id")
            .ok_or_else(|| AppError::Upstream("user info has no subject id".to_string()))?;
        let email = FieldMapping::lookup_string(&raw, &mapping.email, "email")
            .ok_or_else(|| AppError::Upstream("user info has no email".to_string()))?;
        let name = FieldMapping::lookup_string(&raw, &mapping.name, "name");
        let avatar = FieldMapping::lookup_string(&raw, &mapping.avatar, "picture");

        Ok(SsoUserInfo {
            id,
            email,
            name,
            avatar,
            raw,
        })
    }

    /// Links the federated account to a local user, creating one on
    /// first contact. Linking keys exclusively on
    /// (provider, provider_subject), never on email, so two external
    /// accounts sharing an address stay two local users.
    pub async fn reconcile_identity(
        &self,
        tenant_id: &str,
        provider_key: &str,
        provider_subject: &str,
        user_info: &SsoUserInfo,
        access_token: Option<&str>,
        refresh_token: Option<&str>,
    ) -> Result<ReconciledIdentity, AppError> {
        let existing = self
            .identities
            .find_by_subject(provider_key, provider_subject)
            .await?;

        let token_expires_at =
            refresh_token.map(|_| Utc::now() + Duration::days(REFRESH_TOKEN_LIFETIME_DAYS));

        if let Some(identity) = existing {
            if let Some(access_token) = access_token {
                let refresh = IdentityRefresh {
                    profile: user_info.raw.clone(),
                    access_token_sealed: self.vault.encrypt(access_token)?.to_string(),
                    token_expires_at,
                };
                self.identities
                    .refresh_snapshot(&identity.id, &refresh)
                    .await?;
            }

            self.users.touch_last_login(&identity.user_id).await?;

            return Ok(ReconciledIdentity {
                user_id: identity.user_id,
                is_new_user: false,
            });
        }

        // First contact: a fresh local account scoped to the tenant.
        let name = user_info.name.clone().unwrap_or_else(|| {
            user_info
                .email
                .split('@')
                .next()
                .unwrap_or(&user_info.email)
                .to_string()
        });

        let user = self
            .users
            .create_federated(&NewFederatedUser {
                tenant_id: tenant_id.to_string(),
                email: user_info.email.clone(),
                name,
                avatar: user_info.avatar.clone(),
                metadata: user_info.raw.clone(),
            })
            .await?;

        let access_token_sealed = match access_token {
            Some(token) => Some(self.vault.encrypt(token)?.to_string()),
            None => None,
        };
        let refresh_token_sealed = match refresh_token {
            Some(token) => Some(self.vault.encrypt(token)?.to_string()),
            None => None,
        };

        self.identities
            .insert(&NewIdentity {
                user_id: user.id.clone(),
                provider: provider_key.to_string(),
                provider_subject: provider_subject.to_string(),
                profile: user_info.raw.clone(),
                access_token_sealed,
                refresh_token_sealed,
                token_expires_at,
            })
            .await?;

        Ok(ReconciledIdentity {
            user_id: user.id,
            is_new_user: true,
        })
    }

    fn effective_redirect(&self, provider: &ResolvedProvider, redirect_uri: Option<&str>) -> String {
        redirect_uri
            .map(str::to_string)
            .or_else(|| provider.redirect_uri.clone())
            .unwrap_or_else(|| self.callback_url.clone())
    }
}
