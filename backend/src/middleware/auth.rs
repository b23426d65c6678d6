use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, repositories::user::UserRepository as _, state::AppState};

/// The raw credential a request authenticated with, kept for handlers
/// that need to act on the token itself (e.g. logout).
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

pub fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(rest) = header.strip_prefix("bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}

pub fn bearer_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .map(|token| token.to_string())
}

/// Authenticates the request with the full three-check validation and
/// attaches the verified claims, the user record, and the raw token to
/// the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_from_headers(request.headers()).ok_or(AppError::Unauthenticated)?;

    let claims = state.authority.validate(&token).await?;

    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or(AppError::Unauthenticated)?;

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}
