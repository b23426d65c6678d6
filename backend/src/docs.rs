#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    handlers::tokens::ValidateResponse,
    models::{
        token::TokenSet,
        user::{
            LoginRequest, LoginResponse, RefreshRequest, SsoCallbackResponse, SsoInitRequest,
            SsoInitResponse, UserResponse,
        },
    },
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        login_doc,
        sso_init_doc,
        sso_callback_doc,
        refresh_doc,
        logout_doc,
        validate_doc,
        info_doc,
        health_doc,
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        SsoInitRequest,
        SsoInitResponse,
        SsoCallbackResponse,
        RefreshRequest,
        TokenSet,
        UserResponse,
        ValidateResponse,
    )),
    modifiers(&BearerSecurity),
    tags(
        (name = "auth", description = "Password and federated login"),
        (name = "tokens", description = "Bearer credential validation"),
    )
)]
pub struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token set issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "Unknown tenant or application"),
    )
)]
async fn login_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/sso/init",
    tag = "auth",
    request_body = SsoInitRequest,
    responses(
        (status = 200, description = "Authorization URL composed", body = SsoInitResponse),
        (status = 404, description = "Unknown tenant, application, or provider"),
    )
)]
async fn sso_init_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/auth/callback",
    tag = "auth",
    params(
        ("code" = String, Query, description = "Authorization code"),
        ("state" = String, Query, description = "Opaque anti-replay value"),
        ("tenant_slug" = String, Query, description = "Tenant identifier"),
        ("provider_id" = String, Query, description = "Provider identifier"),
        ("client_id" = String, Query, description = "Application client id"),
    ),
    responses(
        (status = 200, description = "Identity reconciled, token set issued", body = SsoCallbackResponse),
        (status = 302, description = "Redirect to the caller-provided URI"),
        (status = 502, description = "Identity provider failure"),
    )
)]
async fn sso_callback_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Rotated token set", body = TokenSet),
        (status = 401, description = "Invalid refresh token"),
    )
)]
async fn refresh_doc() {}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    security(("bearer" = [])),
    responses((status = 200, description = "Session retired"))
)]
async fn logout_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/tokens/validate",
    tag = "tokens",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Credential is valid", body = ValidateResponse),
        (status = 401, description = "Credential is invalid"),
    )
)]
async fn validate_doc() {}

#[utoipa::path(
    get,
    path = "/api/v1/tokens/info",
    tag = "tokens",
    security(("bearer" = [])),
    responses((status = 200, description = "Claims and session details"))
)]
async fn info_doc() {}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Backend health"))
)]
async fn health_doc() {}
