use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::auth_middleware;
use crate::handlers::{admin, health, oauth, pages, session};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.settings.server.request_timeout;
    let static_dir = state.settings.server.static_dir.clone();

    let page_routes = Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login_page))
        .route("/profile", get(pages::profile))
        .route("/admin", get(admin::dashboard));

    let oauth_routes = Router::new()
        .route("/auth/login", get(oauth::login))
        .route("/auth/callback", get(oauth::callback))
        .route("/auth/logout", get(oauth::logout_redirect))
        .route("/api/auth/exchange-code", post(oauth::exchange_code))
        .route("/api/auth/set-session", post(oauth::set_session))
        .route("/api/auth/logout", post(oauth::logout))
        .route("/api/auth/validate", get(session::validate))
        .route("/api/auth/user", get(session::user_info))
        .route("/api/auth/refresh", post(session::refresh));

    let admin_api = Router::new()
        .route("/api/admin/users", get(admin::users))
        .route("/api/admin/analytics", get(admin::analytics))
        .route("/api/admin/settings", get(admin::settings))
        .route("/api/admin/logs", get(admin::logs));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(page_routes)
        .merge(oauth_routes)
        .merge(admin_api)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                    let request_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        path = %req.uri().path(),
                        request_id = %request_id,
                    )
                }))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                ))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
