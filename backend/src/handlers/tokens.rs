use axum::{extract::State, http::HeaderMap, Extension, Json};
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    middleware::auth::bearer_from_headers,
    models::user::User,
    repositories::{tenant as tenant_repo, user::UserRepository as _},
    state::AppState,
    utils::jwt::Claims,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user: Value,
    pub session: Value,
}

/// Full three-check validation of a presented bearer credential, with
/// a user/tenant/session summary for the caller.
pub async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ValidateResponse>, AppError> {
    let token = bearer_from_headers(&headers).ok_or(AppError::Unauthenticated)?;

    let claims = state.authority.validate(&token).await?;

    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or(AppError::Unauthenticated)?;

    let tenant = tenant_repo::find_tenant_by_id(&state.pool, &user.tenant_id).await?;

    Ok(Json(ValidateResponse {
        valid: true,
        user: json!({
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "avatar": user.avatar,
            "tenant": tenant.map(|t| json!({ "id": t.id, "name": t.name, "slug": t.slug })),
        }),
        session: json!({
            "sessionId": claims.session_id,
            "appId": claims.app_id,
        }),
    }))
}

/// Claims and session details for an already-authenticated request.
pub async fn info(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = state
        .authority
        .store()
        .get_session(&claims.session_id)
        .await?;

    Ok(Json(json!({
        "token": {
            "userId": claims.sub,
            "tenantId": claims.tenant_id,
            "appId": claims.app_id,
            "email": claims.email,
            "name": claims.name,
            "sessionId": claims.session_id,
            "issuedAt": claims.iat,
            "expiresAt": claims.exp,
        },
        "session": session,
    })))
}
