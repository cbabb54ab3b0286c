//! Role-gated admin pages and JSON endpoints.
//!
//! The middleware has already proven authentication; each handler proves
//! authorization through [`AdminAuthorization`](crate::security::AdminAuthorization),
//! which reads `is_admin` fresh on every request. When the database is
//! unreachable the handlers answer with empty data and
//! `system_health: "offline"` instead of failing.

use axum::{extract::State, response::Html, Extension, Json};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use super::oauth::OAuthProvider;
use crate::auth::UserContext;
use crate::database::{RepositoryError, UserRecord, UserRepository};
use crate::security::{AdminGrant, SystemHealth};
use crate::state::AppState;
use crate::templates::page_data;
use crate::utils::error::ApiError;

const DASHBOARD_RECENT_USERS: i64 = 5;
const LOG_EVENTS: i64 = 10;
const ACTIVE_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Default, Serialize)]
pub struct SignupCounts {
    pub total_users: i64,
    pub signups_today: i64,
    pub signups_this_week: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub counts: SignupCounts,
    pub recent_users: Vec<UserRecord>,
}

/// Repository to query, or `None` when the grant was issued without one.
fn online_repository<'a>(
    state: &'a AppState,
    grant: &AdminGrant,
) -> Option<&'a Arc<dyn UserRepository>> {
    match grant.system_health {
        SystemHealth::Online => state.users.as_ref(),
        SystemHealth::Offline => None,
    }
}

/// Runs `query` when the database is available, degrading to the default
/// value and `Offline` otherwise.
async fn degrade<T, F, Fut>(state: &AppState, grant: &AdminGrant, what: &str, query: F) -> (T, SystemHealth)
where
    T: Default,
    F: FnOnce(Arc<dyn UserRepository>) -> Fut,
    Fut: std::future::Future<Output = Result<T, RepositoryError>>,
{
    let Some(users) = online_repository(state, grant) else {
        return (T::default(), SystemHealth::Offline);
    };

    match query(users.clone()).await {
        Ok(value) => (value, SystemHealth::Online),
        Err(e) => {
            warn!(error = %e, "Admin {} query failed; serving offline data", what);
            (T::default(), SystemHealth::Offline)
        }
    }
}

async fn load_counts(users: &dyn UserRepository) -> Result<SignupCounts, RepositoryError> {
    Ok(SignupCounts {
        total_users: users.count_users().await?,
        signups_today: users.count_users_created_today().await?,
        signups_this_week: users.count_users_created_this_week().await?,
    })
}

/// GET /admin
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Html<String>, ApiError> {
    let grant = state.admin_auth.require_admin(&user).await?;

    let (stats, health) = degrade(&state, &grant, "dashboard", |users| async move {
        Ok::<_, RepositoryError>(DashboardStats {
            counts: load_counts(users.as_ref()).await?,
            recent_users: users.get_recent_users(DASHBOARD_RECENT_USERS).await?,
        })
    })
    .await;

    let mut data = page_data("Admin", &user);
    data["stats"] = json!(stats);
    data["system_health"] = json!(health);
    data["is_admin"] = json!(true);
    data["is_admin_page"] = json!(true);

    state.templates.render("admin", &data)
}

/// GET /api/admin/users
pub async fn users(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Value>, ApiError> {
    let grant = state.admin_auth.require_admin(&user).await?;

    let (all, health) = degrade(&state, &grant, "users", |users| async move {
        users.get_all_users().await
    })
    .await;

    let active_since = Utc::now() - Duration::days(ACTIVE_WINDOW_DAYS);
    let total = all.len();
    let active = all.iter().filter(|u| u.updated_at >= active_since).count();

    Ok(Json(json!({
        "users": all,
        "total": total,
        "active": active,
        "inactive": total - active,
        "system_health": health,
    })))
}

/// GET /api/admin/analytics
pub async fn analytics(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Value>, ApiError> {
    let grant = state.admin_auth.require_admin(&user).await?;

    let (counts, health) = degrade(&state, &grant, "analytics", |users| async move {
        load_counts(users.as_ref()).await
    })
    .await;

    Ok(Json(json!({
        "total_users": counts.total_users,
        "signups_today": counts.signups_today,
        "signups_this_week": counts.signups_this_week,
        "system_health": health,
    })))
}

/// GET /api/admin/settings
pub async fn settings(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Value>, ApiError> {
    let grant = state.admin_auth.require_admin(&user).await?;
    let settings = &state.settings;

    let providers: Vec<&str> = OAuthProvider::ALL.iter().map(|p| p.as_str()).collect();

    Ok(Json(json!({
        "auth_service_url": settings.auth.base_url,
        "redirect_url": settings.auth.redirect_url,
        "database_enabled": settings.database_enabled(),
        "secure_cookies": state.cookies.secure(),
        "session_cache_ttl_seconds": state.session_cache.ttl().as_secs(),
        "cached_sessions": state.session_cache.len(),
        "supported_providers": providers,
        "admin_fallback_configured": settings.admin.email_configured,
        "admin_source": if grant.record.is_some() { "database" } else { "fallback" },
        "system_health": grant.system_health,
    })))
}

#[derive(Debug, Serialize)]
struct RegistrationEvent {
    event: &'static str,
    user_email: String,
    user_name: String,
    timestamp: String,
}

/// GET /api/admin/logs: recent registrations derived from `created_at`.
pub async fn logs(
    State(state): State<AppState>,
    Extension(user): Extension<UserContext>,
) -> Result<Json<Value>, ApiError> {
    let grant = state.admin_auth.require_admin(&user).await?;

    let (recent, health) = degrade(&state, &grant, "logs", |users| async move {
        users.get_recent_users(LOG_EVENTS).await
    })
    .await;

    let events: Vec<RegistrationEvent> = recent
        .into_iter()
        .map(|u| RegistrationEvent {
            event: "user_registered",
            user_email: u.email,
            user_name: u.name,
            timestamp: u.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(json!({
        "total": events.len(),
        "logs": events,
        "system_health": health,
    })))
}
