//! OAuth broker endpoints.
//!
//! `/auth/login` sends the browser to AuthMS, which runs the provider dance
//! and lands on `/auth/callback`. The callback page posts the code to
//! `/api/auth/exchange-code`, which trades it for a session and installs the
//! cookie.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use tracing::{info, warn};

use super::pages::nav_page_data;
use crate::auth::UserContext;
use crate::state::AppState;
use crate::utils::{error::ApiError, response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
    Discord,
    Microsoft,
}

impl OAuthProvider {
    pub const ALL: [OAuthProvider; 4] = [
        OAuthProvider::Google,
        OAuthProvider::Github,
        OAuthProvider::Discord,
        OAuthProvider::Microsoft,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
            OAuthProvider::Discord => "discord",
            OAuthProvider::Microsoft => "microsoft",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OAuthProvider::Google => "Google",
            OAuthProvider::Github => "GitHub",
            OAuthProvider::Discord => "Discord",
            OAuthProvider::Microsoft => "Microsoft",
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OAuthProvider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub provider: Option<String>,
}

/// GET /auth/login?provider=<p>
pub async fn login(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Response {
    let Some(raw) = query.provider.filter(|p| !p.is_empty()) else {
        return response::found("/login?error=missing_provider");
    };

    let Ok(provider) = raw.parse::<OAuthProvider>() else {
        warn!(provider = %raw, "Rejected unsupported OAuth provider");
        return response::found("/login?error=invalid_provider");
    };

    let auth = &state.settings.auth;
    let location = format!(
        "{}/auth/{}?redirect_uri={}/auth/callback",
        auth.base_url,
        provider.as_str(),
        auth.redirect_url
    );

    info!(provider = provider.as_str(), "Redirecting to auth service");
    response::found(&location)
}

/// GET /auth/callback
pub async fn callback(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Html<String>, ApiError> {
    let data = nav_page_data(&state, "Signing in", &user).await;
    state.templates.render("callback", &data)
}

/// GET /auth/logout: browser-friendly sign out.
pub async fn logout_redirect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let cleared = end_local_session(&state, &headers)?;
    Ok(response::found_with_headers("/", cleared))
}

#[derive(Debug, Deserialize)]
pub struct ExchangeCodeRequest {
    #[serde(default, alias = "code")]
    pub auth_code: Option<String>,
}

/// POST /api/auth/exchange-code
pub async fn exchange_code(
    State(state): State<AppState>,
    payload: Result<Json<ExchangeCodeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let code = payload.auth_code.unwrap_or_default();
    if code.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing authorization code".to_string()));
    }

    let grant = state.auth_client.exchange_code(code.trim()).await.map_err(|e| {
        warn!(error = %e, "Code exchange failed");
        ApiError::from(e)
    })?;

    let mut headers = HeaderMap::new();
    state
        .cookies
        .set(&mut headers, &grant.session_id)
        .map_err(|_| ApiError::Upstream("Auth service returned an invalid session".to_string()))?;

    record_login(&state, &grant.user).await;
    info!(user_id = %grant.user.user_id, "Session established");

    Ok((
        headers,
        Json(json!({
            "success": true,
            "message": "Tokens exchanged successfully",
        })),
    )
        .into_response())
}

/// Upserts the application-level user row. Failures never fail the login.
async fn record_login(state: &AppState, user: &UserContext) {
    let Some(users) = &state.users else {
        return;
    };
    if user.email.is_empty() {
        return;
    }

    let admin = &state.settings.admin;
    let is_admin = admin.email_configured && admin.email.eq_ignore_ascii_case(&user.email);

    if let Err(e) = users.upsert_user(user, is_admin).await {
        warn!(email = %user.email, error = %e, "Failed to record user login");
    }
}

#[derive(Debug, Deserialize)]
pub struct SetSessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// POST /api/auth/set-session
pub async fn set_session(
    State(state): State<AppState>,
    payload: Result<Json<SetSessionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let session_id = payload.session_id.unwrap_or_default();
    if session_id.is_empty() {
        return Err(ApiError::BadRequest("Missing session ID".to_string()));
    }

    let mut headers = HeaderMap::new();
    state.cookies.set(&mut headers, &session_id)?;

    Ok((
        headers,
        Json(json!({
            "success": true,
            "message": "Session set successfully",
        })),
    )
        .into_response())
}

/// POST /api/auth/logout: local-only; AuthMS is not contacted.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let cleared = end_local_session(&state, &headers)?;
    Ok((cleared, Json(json!({ "success": true }))).into_response())
}

/// Evicts the cached session (if any) and returns headers clearing the cookie.
fn end_local_session(state: &AppState, request_headers: &HeaderMap) -> Result<HeaderMap, ApiError> {
    if let Some(session_id) = state.cookies.read(request_headers) {
        state.session_cache.remove(&session_id);
    }

    let mut headers = HeaderMap::new();
    state.cookies.clear(&mut headers)?;
    Ok(headers)
}
