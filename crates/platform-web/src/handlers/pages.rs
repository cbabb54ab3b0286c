use axum::{
    extract::{Query, State},
    response::Html,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::oauth::OAuthProvider;
use crate::auth::UserContext;
use crate::state::AppState;
use crate::templates::page_data;
use crate::utils::error::ApiError;

/// [`page_data`] plus the `is_admin` flag that gates the admin link.
pub(crate) async fn nav_page_data(state: &AppState, title: &str, user: &UserContext) -> Value {
    let mut data = page_data(title, user);
    data["is_admin"] = json!(state.admin_auth.is_admin(user).await);
    data
}

pub async fn home(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Html<String>, ApiError> {
    let data = nav_page_data(&state, "Home", &user).await;
    state.templates.render("home", &data)
}

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
}

pub async fn login_page(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
    Query(query): Query<LoginPageQuery>,
) -> Result<Html<String>, ApiError> {
    let providers: Vec<_> = OAuthProvider::ALL
        .iter()
        .map(|p| json!({ "id": p.as_str(), "label": p.label() }))
        .collect();

    let mut data = nav_page_data(&state, "Sign in", &user).await;
    data["providers"] = json!(providers);
    data["error_message"] = json!(query.error.as_deref().map(login_error_message));

    state.templates.render("login", &data)
}

fn login_error_message(code: &str) -> &'static str {
    match code {
        "missing_provider" => "Please choose a sign-in provider.",
        "invalid_provider" => "That sign-in provider is not supported.",
        _ => "Sign-in failed. Please try again.",
    }
}

/// Only reachable with a session; the middleware redirects everyone else.
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Html<String>, ApiError> {
    let data = nav_page_data(&state, "Profile", &user).await;
    state.templates.render("profile", &data)
}
