use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::{AuthClientError, UserContext};
use crate::state::AppState;
use crate::utils::error::ApiError;

/// GET /api/auth/validate: reports what the middleware resolved.
pub async fn validate(Extension(user): Extension<UserContext>) -> Json<serde_json::Value> {
    Json(json!({
        "valid": user.logged_in,
        "user": user,
    }))
}

/// GET /api/auth/user: fresh user info straight from AuthMS.
pub async fn user_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserContext>, ApiError> {
    let session_id = state.cookies.read(&headers).ok_or(ApiError::Unauthorized)?;

    match state.auth_client.get_user_info(&session_id).await {
        Ok(user) => Ok(Json(user)),
        Err(AuthClientError::NotAuthenticated) => Err(ApiError::Unauthorized),
        Err(e) => {
            warn!(error = %e, "User info lookup failed");
            Err(e.into())
        }
    }
}

/// POST /api/auth/refresh: revalidates against AuthMS, bypassing the cache.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let session_id = state.cookies.read(&headers).ok_or(ApiError::Unauthorized)?;

    let validation = state
        .auth_client
        .validate_session(&session_id)
        .await
        .map_err(|e| {
            warn!(error = %e, "Session refresh failed");
            ApiError::from(e)
        })?;

    if !validation.valid {
        debug!("Refresh found an expired session; clearing cookie");
        state.session_cache.remove(&session_id);

        let mut cleared = HeaderMap::new();
        state.cookies.clear(&mut cleared)?;
        return Ok((
            StatusCode::UNAUTHORIZED,
            cleared,
            Json(json!({ "error": "Session expired" })),
        )
            .into_response());
    }

    let user = UserContext {
        logged_in: true,
        ..validation.user
    };
    state.session_cache.set(&session_id, user.clone());

    Ok(Json(json!({
        "success": true,
        "user": user,
    }))
    .into_response())
}
