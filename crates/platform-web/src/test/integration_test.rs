// End-to-end request scenarios against the full router with AuthMS and the
// user repository mocked out.

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::ServiceExt;
use uuid::Uuid;

use crate::app::build_router;
use crate::auth::client::MockAuthServiceClient;
use crate::auth::{AuthClientError, SessionGrant, SessionValidation, UserContext};
use crate::config::Settings;
use crate::database::{MockUserRepository, RepositoryError, UserRecord, UserRepository};
use crate::state::AppState;

const ADMIN: &str = "admin@example.com";

fn alice() -> UserContext {
    UserContext {
        logged_in: true,
        user_id: "u-1".to_string(),
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        picture: String::new(),
    }
}

fn admin_user() -> UserContext {
    UserContext {
        logged_in: true,
        user_id: "u-admin".to_string(),
        name: "Admin".to_string(),
        email: ADMIN.to_string(),
        picture: String::new(),
    }
}

fn record(email: &str, is_admin: bool, last_seen_days: i64) -> UserRecord {
    let now = Utc::now();
    UserRecord {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: email.split('@').next().unwrap_or_default().to_string(),
        picture: String::new(),
        is_admin,
        created_at: now - Duration::days(60),
        updated_at: now - Duration::days(last_seen_days),
    }
}

fn settings(vars: &[(&str, &str)]) -> Settings {
    Settings::from_map(
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
    .unwrap()
}

fn app_with(
    auth: MockAuthServiceClient,
    users: Option<MockUserRepository>,
    vars: &[(&str, &str)],
) -> Router {
    let users = users.map(|u| Arc::new(u) as Arc<dyn UserRepository>);
    let state = AppState::new(settings(vars), Arc::new(auth), users).unwrap();
    build_router(state)
}

fn app(auth: MockAuthServiceClient) -> Router {
    app_with(auth, None, &[])
}

/// AuthMS mock that accepts `session_id` for `user`.
fn auth_accepting(session_id: &'static str, user: UserContext) -> MockAuthServiceClient {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_validate_session()
        .withf(move |id| id == session_id)
        .returning(move |_| {
            Ok(SessionValidation {
                valid: true,
                user: user.clone(),
            })
        });
    auth
}

fn get(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(id) = session {
        builder = builder.header(header::COOKIE, format!("session_id={}", id));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = session {
        builder = builder.header(header::COOKIE, format!("session_id={}", id));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

// --- pages and route catalog ---

#[tokio::test]
async fn test_anonymous_home_without_cookie_skips_auth_service() {
    // No expectations: any AuthMS call panics.
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains(r#"data-nav="logged-out""#));
    assert!(!html.contains(r#"data-nav="logged-in""#));
}

#[tokio::test]
async fn test_logged_in_home_shows_user_nav() {
    let app = app(auth_accepting("S1", alice()));

    let response = send(&app, get("/", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains(r#"data-nav="logged-in""#));
    assert!(html.contains("Alice"));
}

#[tokio::test]
async fn test_login_page_lists_providers_and_error() {
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/login?error=invalid_provider", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("provider=google"));
    assert!(html.contains("provider=microsoft"));
    assert!(html.contains("That sign-in provider is not supported."));
}

#[tokio::test]
async fn test_protected_page_redirects_to_login() {
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/profile", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_protected_api_returns_401_json_without_cookie_change() {
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/api/admin/users", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(response.headers()).is_empty());
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Authentication required" })
    );
}

#[tokio::test]
async fn test_unknown_path_is_404_not_redirect() {
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/does-not-exist", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check() {
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

// --- session resolution and cache ---

#[tokio::test]
async fn test_second_request_within_ttl_hits_cache() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_validate_session()
        .withf(|id| id == "S1")
        .times(1)
        .returning(|_| {
            Ok(SessionValidation {
                valid: true,
                user: alice(),
            })
        });
    let app = app(auth);

    for _ in 0..2 {
        let response = send(&app, get("/profile", Some("S1"))).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_invalid_sessions_are_not_cached() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_validate_session()
        .times(2)
        .returning(|_| Ok(SessionValidation::invalid()));
    let app = app(auth);

    for _ in 0..2 {
        let response = send(&app, get("/profile", Some("stale"))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
    }
}

#[tokio::test]
async fn test_auth_service_outage_degrades_to_anonymous() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_validate_session()
        .returning(|_| Err(AuthClientError::Transport("connection refused".to_string())));
    let app = app(auth);

    let home = send(&app, get("/", Some("S1"))).await;
    assert_eq!(home.status(), StatusCode::OK);
    assert!(body_text(home).await.contains(r#"data-nav="logged-out""#));

    let profile = send(&app, get("/profile", Some("S1"))).await;
    assert_eq!(profile.status(), StatusCode::FOUND);

    let api = send(&app, get("/api/admin/settings", Some("S1"))).await;
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_validate_endpoint_reports_resolved_user() {
    let app = app(auth_accepting("S1", alice()));

    let body = body_json(send(&app, get("/api/auth/validate", Some("S1"))).await).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["email"], "alice@example.com");

    let body = body_json(send(&app, get("/api/auth/validate", None)).await).await;
    assert_eq!(body["valid"], false);
}

// --- OAuth broker ---

#[tokio::test]
async fn test_login_redirects_to_auth_service() {
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/auth/login?provider=github", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "http://localhost:8080/auth/github?redirect_uri=http://localhost:8081/auth/callback"
    );
}

#[tokio::test]
async fn test_login_rejects_missing_and_unknown_providers() {
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/auth/login", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login?error=missing_provider");

    let response = send(&app, get("/auth/login?provider=myspace", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/login?error=invalid_provider");
}

#[tokio::test]
async fn test_callback_page_posts_code() {
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/auth/callback?auth_code=C1", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("/api/auth/exchange-code"));
}

#[tokio::test]
async fn test_exchange_code_sets_single_session_cookie() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_exchange_code()
        .withf(|code| code == "C1")
        .times(1)
        .returning(|_| {
            Ok(SessionGrant {
                session_id: "S1".to_string(),
                user: alice(),
            })
        });
    let app = app(auth);

    let response = send(
        &app,
        post_json("/api/auth/exchange-code", json!({ "auth_code": "C1" }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(response.headers());
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("session_id=S1"));
    assert!(cookies[0].contains("HttpOnly"));
    assert!(cookies[0].contains("Path=/"));
    assert!(!cookies[0].contains("Secure"));

    assert_eq!(
        body_json(response).await,
        json!({ "success": true, "message": "Tokens exchanged successfully" })
    );
}

#[tokio::test]
async fn test_exchange_code_records_user() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_exchange_code().returning(|_| {
        Ok(SessionGrant {
            session_id: "S1".to_string(),
            user: admin_user(),
        })
    });

    let mut users = MockUserRepository::new();
    users
        .expect_upsert_user()
        .withf(|user, is_admin| user.email == ADMIN && *is_admin)
        .times(1)
        .returning(|_, _| Ok(record(ADMIN, true, 0)));

    let app = app_with(auth, Some(users), &[("ADMIN_EMAIL", ADMIN)]);

    let response = send(
        &app,
        post_json("/api/auth/exchange-code", json!({ "code": "C1" }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_exchange_code_survives_database_failure() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_exchange_code().returning(|_| {
        Ok(SessionGrant {
            session_id: "S1".to_string(),
            user: alice(),
        })
    });

    let mut users = MockUserRepository::new();
    users
        .expect_upsert_user()
        .returning(|_, _| Err(RepositoryError::Database(sqlx::Error::PoolTimedOut)));

    let app = app_with(auth, Some(users), &[]);

    let response = send(
        &app,
        post_json("/api/auth/exchange-code", json!({ "auth_code": "C1" }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(response.headers()).len(), 1);
}

#[tokio::test]
async fn test_exchange_code_requires_code() {
    let app = app(MockAuthServiceClient::new());

    for body in [json!({}), json!({ "auth_code": "" })] {
        let response = send(&app, post_json("/api/auth/exchange-code", body, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(set_cookies(response.headers()).is_empty());
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Missing authorization code" })
        );
    }
}

#[tokio::test]
async fn test_exchange_code_rejects_malformed_json() {
    let app = app(MockAuthServiceClient::new());

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/exchange-code")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_exchange_code_upstream_failure() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_exchange_code()
        .returning(|_| Err(AuthClientError::Provider("code already used".to_string())));
    let app = app(auth);

    let response = send(
        &app,
        post_json("/api/auth/exchange-code", json!({ "auth_code": "C1" }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookies(response.headers()).is_empty());
    assert_eq!(
        body_json(response).await,
        json!({ "error": "code already used" })
    );
}

#[tokio::test]
async fn test_set_session() {
    let app = app(MockAuthServiceClient::new());

    let response = send(
        &app,
        post_json("/api/auth/set-session", json!({ "session_id": "S9" }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(response.headers());
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with("session_id=S9"));

    let response = send(&app, post_json("/api/auth/set-session", json!({}), None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "Missing session ID" }));
}

#[tokio::test]
async fn test_logout_is_idempotent_and_evicts_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let mut auth = MockAuthServiceClient::new();
    auth.expect_validate_session().returning(move |_| {
        // Valid until the user signs out.
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(SessionValidation {
                valid: true,
                user: alice(),
            })
        } else {
            Ok(SessionValidation::invalid())
        }
    });
    let app = app(auth);

    assert_eq!(send(&app, get("/profile", Some("S1"))).await.status(), StatusCode::OK);

    for _ in 0..2 {
        let response = send(&app, post_json("/api/auth/logout", json!({}), Some("S1"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(response.headers());
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("session_id=;"));
        assert!(cookies[0].contains("Max-Age=-1"));
        assert_eq!(body_json(response).await, json!({ "success": true }));
    }

    // Cache entry is gone, so AuthMS is consulted again (second logout and
    // this request).
    let response = send(&app, get("/profile", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_logout_link_clears_cookie_and_redirects_home() {
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/auth/logout", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    assert!(set_cookies(response.headers())[0].contains("Max-Age=-1"));
}

#[tokio::test]
async fn test_user_info() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_get_user_info()
        .withf(|id| id == "S1")
        .returning(|_| Ok(alice()));
    auth.expect_get_user_info()
        .withf(|id| id == "gone")
        .returning(|_| Err(AuthClientError::NotAuthenticated));
    auth.expect_validate_session()
        .returning(|_| Ok(SessionValidation::invalid()));
    let app = app(auth);

    let response = send(&app, get("/api/auth/user", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "alice@example.com");

    let response = send(&app, get("/api/auth/user", Some("gone"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, get("/api/auth/user", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_expired_session_clears_cookie() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_validate_session()
        .returning(|_| Ok(SessionValidation::invalid()));
    let app = app(auth);

    let response = send(&app, post_json("/api/auth/refresh", json!({}), Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(response.headers())[0].contains("Max-Age=-1"));
    assert_eq!(body_json(response).await, json!({ "error": "Session expired" }));
}

#[tokio::test]
async fn test_refresh_valid_session() {
    let app = app(auth_accepting("S1", alice()));

    let response = send(&app, post_json("/api/auth/refresh", json!({}), Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["user_id"], "u-1");
}

// --- admin ---

#[tokio::test]
async fn test_admin_api_forbidden_for_regular_user() {
    let mut users = MockUserRepository::new();
    users
        .expect_get_user_by_email()
        .returning(|email| Ok(Some(record(email, false, 0))));

    let app = app_with(auth_accepting("S1", alice()), Some(users), &[]);

    let response = send(&app, get("/api/admin/users", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(
        body_text(response).await,
        "Access denied: Admin privileges required"
    );
}

#[tokio::test]
async fn test_admin_users_online() {
    let mut users = MockUserRepository::new();
    users
        .expect_get_user_by_email()
        .returning(|email| Ok(Some(record(email, true, 0))));
    users.expect_get_all_users().returning(|| {
        Ok(vec![
            record(ADMIN, true, 0),
            record("dormant@example.com", false, 45),
        ])
    });

    let app = app_with(auth_accepting("S1", admin_user()), Some(users), &[]);

    let response = send(&app, get("/api/admin/users", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["active"], 1);
    assert_eq!(body["inactive"], 1);
    assert_eq!(body["system_health"], "online");
    assert_eq!(body["users"][1]["email"], "dormant@example.com");
}

#[tokio::test]
async fn test_admin_dashboard_renders_stats() {
    let mut users = MockUserRepository::new();
    users
        .expect_get_user_by_email()
        .returning(|email| Ok(Some(record(email, true, 0))));
    users.expect_count_users().returning(|| Ok(42));
    users.expect_count_users_created_today().returning(|| Ok(3));
    users.expect_count_users_created_this_week().returning(|| Ok(7));
    users
        .expect_get_recent_users()
        .withf(|limit| *limit == 5)
        .returning(|_| Ok(vec![record("new@example.com", false, 0)]));

    let app = app_with(auth_accepting("S1", admin_user()), Some(users), &[]);

    let response = send(&app, get("/admin", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Database: online"));
    assert!(html.contains("42"));
    assert!(html.contains("new@example.com"));
}

#[tokio::test]
async fn test_admin_analytics_degrades_when_queries_fail() {
    let mut users = MockUserRepository::new();
    users
        .expect_get_user_by_email()
        .returning(|email| Ok(Some(record(email, true, 0))));
    users
        .expect_count_users()
        .returning(|| Err(RepositoryError::Database(sqlx::Error::PoolTimedOut)));

    let app = app_with(auth_accepting("S1", admin_user()), Some(users), &[]);

    let response = send(&app, get("/api/admin/analytics", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "total_users": 0,
            "signups_today": 0,
            "signups_this_week": 0,
            "system_health": "offline",
        })
    );
}

#[tokio::test]
async fn test_admin_fallback_email_without_database() {
    let app = app_with(
        auth_accepting("S1", admin_user()),
        None,
        &[("ADMIN_EMAIL", ADMIN)],
    );

    let response = send(&app, get("/api/admin/logs", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["system_health"], "offline");
    assert_eq!(body["logs"], json!([]));

    let response = send(&app, get("/api/admin/settings", Some("S1"))).await;
    let body = body_json(response).await;
    assert_eq!(body["database_enabled"], false);
    assert_eq!(body["cached_sessions"], 1);
    assert_eq!(body["session_cache_ttl_seconds"], 15);
    assert_eq!(body["admin_source"], "fallback");
}

#[tokio::test]
async fn test_admin_denied_without_database_or_configured_email() {
    let app = app_with(auth_accepting("S1", admin_user()), None, &[]);

    let response = send(&app, get("/api/admin/analytics", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_logs_lists_registrations() {
    let mut users = MockUserRepository::new();
    users
        .expect_get_user_by_email()
        .returning(|email| Ok(Some(record(email, true, 0))));
    users
        .expect_get_recent_users()
        .withf(|limit| *limit == 10)
        .returning(|_| Ok(vec![record("bob@example.com", false, 1)]));

    let app = app_with(auth_accepting("S1", admin_user()), Some(users), &[]);

    let body = body_json(send(&app, get("/api/admin/logs", Some("S1"))).await).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["logs"][0]["event"], "user_registered");
    assert_eq!(body["logs"][0]["user_email"], "bob@example.com");
    assert_eq!(body["system_health"], "online");
}

#[tokio::test]
async fn test_admin_page_forbidden_for_regular_user() {
    let mut users = MockUserRepository::new();
    users
        .expect_get_user_by_email()
        .returning(|email| Ok(Some(record(email, false, 0))));

    let app = app_with(auth_accepting("S1", alice()), Some(users), &[]);

    let response = send(&app, get("/admin", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(
        body_text(response).await,
        "Access denied: Admin privileges required"
    );
}

#[tokio::test]
async fn test_admin_link_only_shown_to_admins() {
    let mut users = MockUserRepository::new();
    users
        .expect_get_user_by_email()
        .returning(|email| Ok(Some(record(email, false, 0))));
    let app = app_with(auth_accepting("S1", alice()), Some(users), &[]);

    let html = body_text(send(&app, get("/", Some("S1"))).await).await;
    assert!(html.contains(r#"data-nav="logged-in""#));
    assert!(!html.contains(r#"href="/admin""#));

    let app = app_with(
        auth_accepting("S1", admin_user()),
        None,
        &[("ADMIN_EMAIL", ADMIN)],
    );
    let html = body_text(send(&app, get("/profile", Some("S1"))).await).await;
    assert!(html.contains(r#"href="/admin""#));
}

// --- round trips and failure bodies ---

#[tokio::test]
async fn test_exchanged_cookie_logs_user_in() {
    let mut auth = auth_accepting("S1", alice());
    auth.expect_exchange_code().times(1).returning(|_| {
        Ok(SessionGrant {
            session_id: "S1".to_string(),
            user: alice(),
        })
    });
    let app = app(auth);

    let response = send(
        &app,
        post_json("/api/auth/exchange-code", json!({ "auth_code": "C1" }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = set_cookies(response.headers()).remove(0);
    let pair = set_cookie.split(';').next().unwrap().trim().to_string();

    let request = Request::builder()
        .method("GET")
        .uri("/profile")
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains(r#"data-nav="logged-in""#));
    assert!(html.contains("Alice"));
}

const UNAVAILABLE: &str = "Authentication service unavailable";

fn unreachable() -> AuthClientError {
    AuthClientError::Transport(
        "error sending request for url (http://127.0.0.1:1/auth/session/create)".to_string(),
    )
}

#[tokio::test]
async fn test_exchange_code_hides_transport_details() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_exchange_code().returning(|_| Err(unreachable()));
    let app = app(auth);

    let response = send(
        &app,
        post_json("/api/auth/exchange-code", json!({ "auth_code": "c1" }), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookies(response.headers()).is_empty());
    assert_eq!(body_json(response).await, json!({ "error": UNAVAILABLE }));
}

#[tokio::test]
async fn test_refresh_and_user_info_hide_transport_details() {
    let mut auth = MockAuthServiceClient::new();
    auth.expect_validate_session().returning(|_| Err(unreachable()));
    auth.expect_get_user_info().returning(|_| Err(unreachable()));
    let app = app(auth);

    let response = send(&app, post_json("/api/auth/refresh", json!({}), Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert_eq!(body, json!({ "error": UNAVAILABLE }).to_string());
    assert!(!body.contains("127.0.0.1"));

    let response = send(&app, get("/api/auth/user", Some("S1"))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({ "error": UNAVAILABLE }));
}

#[tokio::test]
async fn test_stylesheet_is_served() {
    let app = app(MockAuthServiceClient::new());

    let response = send(&app, get("/static/app.css", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

