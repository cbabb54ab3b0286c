use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::routes::RouteCategory;
use super::types::UserContext;
use crate::state::AppState;
use crate::utils::{error::ApiError, response};

/// Resolves the session on every request and enforces the route catalog.
///
/// The resolved [`UserContext`] is inserted into request extensions (also for
/// public pages, so navigation can reflect the login state). Protected API
/// paths answer 401 JSON; protected pages redirect to `/login`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let category = RouteCategory::classify(request.uri().path());
    let user = resolve_session(&state, request.headers()).await;
    let logged_in = user.logged_in;

    request.extensions_mut().insert(user);

    if category.requires_session() && !logged_in {
        let path = request.uri().path();
        debug!(path, %category, "Rejecting unauthenticated request");

        return if path.starts_with("/api/") {
            ApiError::Unauthorized.into_response()
        } else {
            response::found("/login")
        };
    }

    next.run(request).await
}

/// Cookie -> cache -> AuthMS. Failures of any kind resolve to the anonymous
/// context and are never cached.
pub async fn resolve_session(state: &AppState, headers: &HeaderMap) -> UserContext {
    let Some(session_id) = state.cookies.read(headers) else {
        return UserContext::anonymous();
    };

    if let Some(user) = state.session_cache.get(&session_id) {
        debug!("Session cache hit");
        return user;
    }

    match state.auth_client.validate_session(&session_id).await {
        Ok(validation) if validation.valid => {
            let user = UserContext {
                logged_in: true,
                ..validation.user
            };
            state.session_cache.set(&session_id, user.clone());
            debug!(user_id = %user.user_id, "Session validated");
            user
        }
        Ok(_) => {
            debug!("Session rejected by auth service");
            UserContext::anonymous()
        }
        Err(e) if e.is_transport() => {
            warn!(error = %e, "Auth service unreachable; treating request as anonymous");
            UserContext::anonymous()
        }
        Err(e) => {
            debug!(error = %e, "Session validation rejected; treating request as anonymous");
            UserContext::anonymous()
        }
    }
}
