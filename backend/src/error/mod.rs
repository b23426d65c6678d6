use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Message returned for every authentication failure, regardless of
/// which internal check rejected the credential.
pub const UNAUTHENTICATED_MESSAGE: &str = "Invalid or expired credentials";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug)]
pub enum AppError {
    /// Bad, expired, or revoked credential. Carries no cause: callers
    /// must not learn which validation layer rejected them.
    Unauthenticated,
    NotFound(String),
    Forbidden(String),
    Conflict(String),
    BadRequest(String),
    /// Identity-provider network or non-2xx failure. Not retried here.
    Upstream(String),
    /// Decrypt/authentication-tag failure. Fatal to the operation.
    Crypto(String),
    Validation(Vec<String>),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code, details) = match self {
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                UNAUTHENTICATED_MESSAGE.to_string(),
                "UNAUTHENTICATED".to_string(),
                None,
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND".to_string(), None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, "FORBIDDEN".to_string(), None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT".to_string(), None),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg,
                "BAD_REQUEST".to_string(),
                None,
            ),
            AppError::Upstream(msg) => {
                tracing::warn!("Upstream identity provider failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "SSO provider request failed".to_string(),
                    "UPSTREAM_FAILURE".to_string(),
                    None,
                )
            }
            AppError::Crypto(msg) => {
                tracing::error!("Crypto failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Secret decryption failed".to_string(),
                    "CRYPTO_FAILURE".to_string(),
                    None,
                )
            }
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                "VALIDATION_ERROR".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
            AppError::Internal(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code,
            details,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            _ => AppError::Internal(err.into()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let code = e.code.as_ref();
                    format!("{}: {}", field, code)
                })
            })
            .collect();
        AppError::Validation(messages)
    }
}
