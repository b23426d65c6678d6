//! Session lifecycle and token issuance/refresh/revocation.
//!
//! A session moves `created -> active -> {expired | revoked}`;
//! terminal states are final. A revoked or expired session is never
//! resurrected, only superseded by a new session from a fresh login.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::session::{NewSession, Session};
use crate::models::token::{TokenMeta, TokenSet};
use crate::repositories::token::TokenLedger;
use crate::services::audit::{AuditEvent, AuditSink};
use crate::services::session_store::SessionStore;
use crate::utils::jwt::{Claims, SubjectClaims, TokenIssuer, TokenKind};

#[derive(Clone)]
pub struct SessionAuthority {
    issuer: TokenIssuer,
    store: SessionStore,
    ledger: Arc<dyn TokenLedger>,
    audit: Arc<dyn AuditSink>,
}

impl SessionAuthority {
    pub fn new(
        issuer: TokenIssuer,
        store: SessionStore,
        ledger: Arc<dyn TokenLedger>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            issuer,
            store,
            ledger,
            audit,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn login(&self, attrs: NewSession) -> Result<Session, AppError> {
        let session = self.store.create_session(attrs).await?;
        self.audit
            .record(
                AuditEvent::new("login")
                    .tenant(session.tenant_id.clone())
                    .user(session.user_id.clone())
                    .app(session.app_id.clone()),
            )
            .await;
        Ok(session)
    }

    /// Issues the access/refresh/id triple for a session and registers
    /// the access and refresh tokens in the membership index with
    /// matching TTLs. The id-token is handed out but never indexed:
    /// it cannot be individually revoked and dies on its own expiry.
    pub async fn issue_token_set(&self, subject: &SubjectClaims) -> Result<TokenSet, AppError> {
        let access_token = self.issuer.issue(TokenKind::Access, subject)?;
        let refresh_token = self.issuer.issue(TokenKind::Refresh, subject)?;
        let id_token = self.issuer.issue(TokenKind::Id, subject)?;

        let access_ttl = self.issuer.ttl_for(TokenKind::Access);
        let refresh_ttl = self.issuer.ttl_for(TokenKind::Refresh);

        self.store
            .put_token(
                &access_token,
                &TokenMeta {
                    user_id: subject.user_id.clone(),
                    session_id: subject.session_id.clone(),
                    kind: TokenKind::Access,
                },
                access_ttl,
            )
            .await?;
        self.store
            .put_token(
                &refresh_token,
                &TokenMeta {
                    user_id: subject.user_id.clone(),
                    session_id: subject.session_id.clone(),
                    kind: TokenKind::Refresh,
                },
                refresh_ttl,
            )
            .await?;

        self.record_issued(&access_token, TokenKind::Access, subject, access_ttl)
            .await;
        self.record_issued(&refresh_token, TokenKind::Refresh, subject, refresh_ttl)
            .await;

        Ok(TokenSet {
            access_token,
            refresh_token,
            id_token,
            expires_in: access_ttl,
            token_type: "Bearer".to_string(),
        })
    }

    /// Durable bookkeeping is fire-and-forget: a ledger failure never
    /// blocks issuance.
    async fn record_issued(
        &self,
        token: &str,
        kind: TokenKind,
        subject: &SubjectClaims,
        ttl_seconds: u64,
    ) {
        let expires_at = chrono::Utc::now() + chrono::Duration::seconds(ttl_seconds as i64);
        if let Err(e) = self
            .ledger
            .record(token, kind, &subject.user_id, &subject.session_id, expires_at)
            .await
        {
            tracing::warn!(user_id = %subject.user_id, "Token ledger record failed: {e:?}");
        }
    }

    /// Three checks, all required: signature/expiry, membership-index
    /// presence, and session liveness. Callers learn only that the
    /// credential is invalid, never which check rejected it.
    pub async fn validate(&self, token: &str) -> Result<Claims, AppError> {
        // Fail fast on signature/expiry before touching the stores.
        let claims = self.issuer.verify(token)?;

        let Some(_meta) = self.store.get_token(token).await? else {
            return Err(AppError::Unauthenticated);
        };

        let Some(session) = self.store.get_session(&claims.session_id).await? else {
            return Err(AppError::Unauthenticated);
        };

        if !Self::claims_match_session(&claims, &session) {
            return Err(AppError::Unauthenticated);
        }

        Ok(claims)
    }

    /// A credential is only honored for the session it was derived
    /// from: user, tenant, and app references must all agree.
    fn claims_match_session(claims: &Claims, session: &Session) -> bool {
        claims.sub == session.user_id
            && claims.tenant_id == session.tenant_id
            && claims.app_id == session.app_id
    }

    /// Rotates a refresh token: the full validation above plus a kind
    /// check, then a brand-new token set bound to the *same* session.
    /// The old refresh token is consumed atomically, so a second
    /// refresh with the same value is rejected.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AppError> {
        let claims = self.issuer.verify(refresh_token)?;

        // Kind is checked before the index entry is consumed; an
        // access token presented here must not lose its membership.
        if claims.kind != TokenKind::Refresh {
            return Err(AppError::Unauthenticated);
        }

        let Some(meta) = self.store.take_token(refresh_token).await? else {
            return Err(AppError::Unauthenticated);
        };
        if meta.kind != TokenKind::Refresh {
            return Err(AppError::Unauthenticated);
        }

        let Some(session) = self.store.get_session(&claims.session_id).await? else {
            return Err(AppError::Unauthenticated);
        };
        if !Self::claims_match_session(&claims, &session) {
            return Err(AppError::Unauthenticated);
        }

        let subject = SubjectClaims {
            user_id: claims.sub.clone(),
            tenant_id: claims.tenant_id.clone(),
            app_id: claims.app_id.clone(),
            session_id: claims.session_id.clone(),
            email: claims.email.clone(),
            name: claims.name.clone(),
        };
        let tokens = self.issue_token_set(&subject).await?;

        self.audit
            .record(
                AuditEvent::new("refresh")
                    .tenant(claims.tenant_id.clone())
                    .user(claims.sub.clone())
                    .app(claims.app_id.clone()),
            )
            .await;

        Ok(tokens)
    }

    /// Resolves the presented credential, retires its session, and
    /// flags the user's durable token records revoked.
    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        let claims = self.validate(token).await?;

        self.store.delete_session(&claims.session_id).await?;

        if let Err(e) = self.ledger.revoke_all_for_user(&claims.sub).await {
            tracing::warn!(user_id = %claims.sub, "Token ledger revocation failed: {e:?}");
        }

        self.audit
            .record(
                AuditEvent::new("logout")
                    .tenant(claims.tenant_id.clone())
                    .user(claims.sub.clone())
                    .app(claims.app_id.clone()),
            )
            .await;

        Ok(())
    }

    /// Revokes every session and indexed token for a user.
    pub async fn revoke_all(&self, user_id: &str) -> Result<(), AppError> {
        self.store.delete_all_sessions_for_user(user_id).await?;
        self.store.drop_all_tokens_for_user(user_id).await?;

        if let Err(e) = self.ledger.revoke_all_for_user(user_id).await {
            tracing::warn!(user_id, "Token ledger revocation failed: {e:?}");
        }

        self.audit
            .record(AuditEvent::new("revoke_all").user(user_id))
            .await;

        Ok(())
    }
}
