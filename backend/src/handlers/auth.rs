use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{client_ip, user_agent},
    middleware::auth::bearer_from_headers,
    models::{
        app::App,
        session::NewSession,
        tenant::Tenant,
        user::{
            LoginRequest, LoginResponse, RefreshRequest, SsoCallbackResponse, SsoInitRequest,
            SsoInitResponse, UserResponse,
        },
    },
    repositories::{app as app_repo, tenant as tenant_repo, user::UserRepository as _},
    services::audit::AuditEvent,
    state::AppState,
    utils::jwt::SubjectClaims,
};

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate()?;

    let tenant = resolve_tenant(&state, &payload.tenant_slug).await?;
    let app = resolve_app(&state, &tenant, &payload.client_id).await?;

    let user = state
        .users
        .find_active_by_email(&tenant.id, &payload.email)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    // Accounts created through SSO carry no password hash; a password
    // login against one is indistinguishable from a bad password.
    let password_hash = user
        .password_hash
        .as_deref()
        .ok_or(AppError::Unauthenticated)?;
    let matches = crate::utils::password::verify_password(&payload.password, password_hash)
        .map_err(AppError::Internal)?;
    if !matches {
        return Err(AppError::Unauthenticated);
    }

    let session = state
        .authority
        .login(NewSession {
            tenant_id: tenant.id.clone(),
            user_id: user.id.clone(),
            app_id: Some(app.id.clone()),
            ip_address: client_ip(&headers),
            user_agent: user_agent(&headers),
            ..Default::default()
        })
        .await?;

    let tokens = state
        .authority
        .issue_token_set(&SubjectClaims {
            user_id: user.id.clone(),
            tenant_id: tenant.id.clone(),
            app_id: Some(app.id.clone()),
            session_id: session.session_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        })
        .await?;

    state.users.touch_last_login(&user.id).await?;

    let redirect_url = match &payload.redirect_uri {
        Some(redirect_uri) => Some(append_code(redirect_uri, &tokens.access_token, None)?),
        None => None,
    };

    Ok(Json(LoginResponse {
        tokens,
        user: UserResponse::from(user),
        redirect_url,
    }))
}

pub async fn sso_init(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SsoInitRequest>,
) -> Result<Json<SsoInitResponse>, AppError> {
    payload.validate()?;

    let tenant = resolve_tenant(&state, &payload.tenant_slug).await?;
    let app = resolve_app(&state, &tenant, &payload.client_id).await?;

    // Opaque anti-replay value. Persisting and checking it on the way
    // back is the caller's responsibility.
    let state_param = Uuid::new_v4().to_string();

    let auth_url = state
        .sso
        .build_authorization_url(
            &tenant.id,
            &payload.provider_id,
            &state_param,
            payload.redirect_uri.as_deref(),
        )
        .await?;

    state
        .audit
        .record(
            AuditEvent::new("sso_init")
                .tenant(tenant.id.clone())
                .app(Some(app.id.clone()))
                .resource(payload.provider_id.clone())
                .details(json!({ "ip": client_ip(&headers) })),
        )
        .await;

    Ok(Json(SsoInitResponse {
        auth_url,
        state: state_param,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub tenant_slug: Option<String>,
    pub provider_id: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
}

pub async fn sso_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    if let Some(error) = query.error {
        return Err(AppError::BadRequest(format!("SSO error: {}", error)));
    }

    let (Some(code), Some(state_param)) = (query.code, query.state) else {
        return Err(AppError::BadRequest(
            "Missing code or state parameter".to_string(),
        ));
    };
    let (Some(tenant_slug), Some(provider_id), Some(client_id)) =
        (query.tenant_slug, query.provider_id, query.client_id)
    else {
        return Err(AppError::BadRequest(
            "Missing required parameters".to_string(),
        ));
    };

    let tenant = resolve_tenant(&state, &tenant_slug).await?;
    let app = resolve_app(&state, &tenant, &client_id).await?;

    let token_payload = state
        .sso
        .exchange_code(
            &tenant.id,
            &provider_id,
            &code,
            query.redirect_uri.as_deref(),
        )
        .await?;

    let access_token = token_payload
        .get("access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Upstream("token payload has no access_token".to_string()))?
        .to_string();
    let refresh_token = token_payload
        .get("refresh_token")
        .and_then(Value::as_str)
        .map(str::to_string);

    let user_info = state
        .sso
        .fetch_user_info(&tenant.id, &provider_id, &access_token)
        .await?;

    let provider = state.sso.resolve_provider(&tenant.id, &provider_id).await?;
    let reconciled = state
        .sso
        .reconcile_identity(
            &tenant.id,
            &provider.provider_key,
            &user_info.id,
            &user_info,
            Some(&access_token),
            refresh_token.as_deref(),
        )
        .await?;

    let user = state
        .users
        .find_by_id(&reconciled.user_id)
        .await?
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("user missing after reconciliation"))
        })?;

    let session = state
        .authority
        .login(NewSession {
            tenant_id: tenant.id.clone(),
            user_id: user.id.clone(),
            app_id: Some(app.id.clone()),
            ip_address: client_ip(&headers),
            user_agent: user_agent(&headers),
            ..Default::default()
        })
        .await?;

    let tokens = state
        .authority
        .issue_token_set(&SubjectClaims {
            user_id: user.id.clone(),
            tenant_id: tenant.id.clone(),
            app_id: Some(app.id.clone()),
            session_id: session.session_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        })
        .await?;

    state
        .audit
        .record(
            AuditEvent::new("sso_callback")
                .tenant(tenant.id.clone())
                .user(user.id.clone())
                .app(Some(app.id.clone()))
                .resource(provider_id.clone())
                .details(json!({
                    "isNewUser": reconciled.is_new_user,
                    "provider": provider.provider_key,
                })),
        )
        .await;

    if let Some(redirect_uri) = query.redirect_uri {
        let target = append_code(&redirect_uri, &tokens.access_token, Some(&state_param))?;
        return Ok(Redirect::to(&target).into_response());
    }

    Ok(Json(SsoCallbackResponse {
        tokens,
        user: UserResponse::from(user),
        is_new_user: reconciled.is_new_user,
    })
    .into_response())
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<Value>, AppError> {
    payload.validate()?;

    let tokens = state.authority.refresh(&payload.refresh_token).await?;

    Ok(Json(json!({ "tokens": tokens })))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = bearer_from_headers(&headers).ok_or(AppError::Unauthenticated)?;

    // Logout is idempotent: a credential that no longer validates has
    // nothing left to revoke.
    match state.authority.logout(&token).await {
        Ok(()) | Err(AppError::Unauthenticated) => {}
        Err(e) => return Err(e),
    }

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

async fn resolve_tenant(state: &AppState, slug: &str) -> Result<Tenant, AppError> {
    tenant_repo::find_tenant_by_slug(&state.pool, slug)
        .await?
        .filter(|tenant| tenant.is_active)
        .ok_or_else(|| AppError::NotFound("Tenant not found or inactive".to_string()))
}

async fn resolve_app(state: &AppState, tenant: &Tenant, client_id: &str) -> Result<App, AppError> {
    app_repo::find_app_by_client_id(&state.pool, client_id)
        .await?
        .filter(|app| app.is_active && app.tenant_id == tenant.id)
        .ok_or_else(|| AppError::NotFound("Application not found or inactive".to_string()))
}

fn append_code(redirect_uri: &str, code: &str, state: Option<&str>) -> Result<String, AppError> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|_| AppError::BadRequest("Invalid redirect URI".to_string()))?;
    url.query_pairs_mut().append_pair("code", code);
    if let Some(state) = state {
        url.query_pairs_mut().append_pair("state", state);
    }
    Ok(url.to_string())
}
