use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    found_with_headers(location, HeaderMap::new())
}

/// `302 Found` carrying extra headers (e.g. `Set-Cookie`).
pub fn found_with_headers(location: &str, headers: HeaderMap) -> Response {
    (
        StatusCode::FOUND,
        headers,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}
