use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;

/// Discriminator for the three credential kinds sharing one signing
/// secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    Id,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Id => "id",
        }
    }
}

/// Verified claims. Only produced by [`TokenIssuer::verify`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    pub session_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Claims read without signature or expiry checks. Diagnostics only:
/// nothing that authorizes may accept this type.
#[derive(Debug, Clone, Deserialize)]
pub struct UnverifiedClaims {
    pub sub: String,
    pub tenant_id: String,
    pub app_id: Option<String>,
    pub session_id: String,
    pub email: String,
    pub name: Option<String>,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// The identity a credential is issued for; `iat`/`exp`/`kind` are
/// filled in at issue time.
#[derive(Debug, Clone)]
pub struct SubjectClaims {
    pub user_id: String,
    pub tenant_id: String,
    pub app_id: Option<String>,
    pub session_id: String,
    pub email: String,
    pub name: Option<String>,
}

/// Signs and verifies the broker's bearer credentials with one shared
/// symmetric secret.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    access_ttl: u64,
    refresh_ttl: u64,
    id_ttl: u64,
}

impl TokenIssuer {
    pub fn new(secret: String, access_ttl: u64, refresh_ttl: u64, id_ttl: u64) -> Self {
        Self {
            secret,
            access_ttl,
            refresh_ttl,
            id_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.access_token_expiry,
            config.refresh_token_expiry,
            config.id_token_expiry,
        )
    }

    /// Default lifetime in seconds for a credential kind.
    pub fn ttl_for(&self, kind: TokenKind) -> u64 {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
            TokenKind::Id => self.id_ttl,
        }
    }

    pub fn issue(&self, kind: TokenKind, subject: &SubjectClaims) -> Result<String, AppError> {
        self.issue_with_ttl(kind, subject, self.ttl_for(kind))
    }

    pub fn issue_with_ttl(
        &self,
        kind: TokenKind,
        subject: &SubjectClaims,
        ttl_seconds: u64,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(ttl_seconds as i64);

        let claims = Claims {
            sub: subject.user_id.clone(),
            tenant_id: subject.tenant_id.clone(),
            app_id: subject.app_id.clone(),
            session_id: subject.session_id.clone(),
            email: subject.email.clone(),
            name: subject.name.clone(),
            kind,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    /// Signature mismatch, malformed structure, and past expiry all
    /// collapse into the same error: callers treat them uniformly as
    /// unauthenticated.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthenticated)
    }

    /// Reads claims without checking the signature or expiry. Returns
    /// `None` for structurally unreadable tokens.
    pub fn decode_unchecked(token: &str) -> Option<UnverifiedClaims> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<UnverifiedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("testsecret".into(), 3600, 2_592_000, 3600)
    }

    fn subject() -> SubjectClaims {
        SubjectClaims {
            user_id: "user-123".into(),
            tenant_id: "tenant-1".into(),
            app_id: Some("app-1".into()),
            session_id: "session-9".into(),
            email: "a@acme.com".into(),
            name: Some("Alice".into()),
        }
    }

    #[test]
    fn issue_and_verify_access_token() {
        let issuer = issuer();
        let token = issuer
            .issue(TokenKind::Access, &subject())
            .expect("issue token");
        let claims = issuer.verify(&token).expect("verify token");

        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.tenant_id, "tenant-1");
        assert_eq!(claims.session_id, "session-9");
        assert_eq!(claims.email, "a@acme.com");
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn kinds_carry_their_discriminator() {
        let issuer = issuer();
        for kind in [TokenKind::Access, TokenKind::Refresh, TokenKind::Id] {
            let token = issuer.issue(kind, &subject()).expect("issue");
            assert_eq!(issuer.verify(&token).expect("verify").kind, kind);
        }
    }

    #[test]
    fn verify_with_wrong_secret_fails() {
        let token = issuer()
            .issue(TokenKind::Access, &subject())
            .expect("issue token");
        let other = TokenIssuer::new("othersecret".into(), 3600, 3600, 3600);
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn expired_token_fails_verification() {
        let issuer = issuer();
        // jsonwebtoken applies default leeway; push exp well past it.
        let claims = Claims {
            sub: "user-123".into(),
            tenant_id: "tenant-1".into(),
            app_id: None,
            session_id: "session-9".into(),
            email: "a@acme.com".into(),
            name: None,
            kind: TokenKind::Access,
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let stale = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("testsecret".as_ref()),
        )
        .expect("encode");

        assert!(issuer.verify(&stale).is_err());
    }

    #[test]
    fn malformed_token_fails() {
        assert!(issuer().verify("invalid.token.here").is_err());
        assert!(issuer().verify("").is_err());
    }

    #[test]
    fn decode_unchecked_reads_expired_tokens() {
        let claims = Claims {
            sub: "user-123".into(),
            tenant_id: "tenant-1".into(),
            app_id: None,
            session_id: "session-9".into(),
            email: "a@acme.com".into(),
            name: None,
            kind: TokenKind::Refresh,
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let stale = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("some-other-secret".as_ref()),
        )
        .expect("encode");

        let peeked = TokenIssuer::decode_unchecked(&stale).expect("decode");
        assert_eq!(peeked.sub, "user-123");
        assert_eq!(peeked.kind, TokenKind::Refresh);
    }

    #[test]
    fn decode_unchecked_returns_none_for_garbage() {
        assert!(TokenIssuer::decode_unchecked("not-a-jwt").is_none());
    }
}
