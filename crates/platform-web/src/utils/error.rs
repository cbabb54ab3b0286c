use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::client::AuthClientError;
use crate::auth::cookie::CookieError;
use crate::database::RepositoryError;

pub const AUTH_REQUIRED: &str = "Authentication required";
pub const ADMIN_REQUIRED: &str = "Access denied: Admin privileges required";
pub const AUTH_SERVICE_UNAVAILABLE: &str = "Authentication service unavailable";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied: Admin privileges required")]
    Forbidden,

    /// AuthMS failure surfaced to the caller with the service's own message.
    #[error("Auth service error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

fn plain_text(status: StatusCode, message: &'static str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                json_error(StatusCode::BAD_REQUEST, msg)
            }
            ApiError::Unauthorized => {
                tracing::debug!("Unauthorized request");
                json_error(StatusCode::UNAUTHORIZED, AUTH_REQUIRED.to_string())
            }
            ApiError::Forbidden => {
                tracing::warn!("Forbidden: admin privileges required");
                plain_text(StatusCode::FORBIDDEN, ADMIN_REQUIRED)
            }
            ApiError::Upstream(msg) => {
                tracing::error!("Auth service error: {}", msg);
                json_error(StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ApiError::Storage(msg) => {
                tracing::error!("Database error: {}", msg);
                json_error(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database unavailable".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Only the auth service's own message reaches the client; transport
/// details (URLs, driver errors) stay in the logs.
impl From<AuthClientError> for ApiError {
    fn from(err: AuthClientError) -> Self {
        if err.is_transport() {
            tracing::warn!(error = %err, "Auth service unavailable");
            return ApiError::Upstream(AUTH_SERVICE_UNAVAILABLE.to_string());
        }

        match err {
            AuthClientError::NotAuthenticated => ApiError::Unauthorized,
            AuthClientError::InvalidCode(msg) | AuthClientError::Provider(msg) => {
                ApiError::Upstream(msg)
            }
            AuthClientError::Transport(_) => {
                ApiError::Upstream(AUTH_SERVICE_UNAVAILABLE.to_string())
            }
        }
    }
}

impl From<CookieError> for ApiError {
    fn from(err: CookieError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<handlebars::RenderError> for ApiError {
    fn from(err: handlebars::RenderError) -> Self {
        ApiError::Internal(format!("template rendering failed: {}", err))
    }
}
