//! Static catalog mapping URL paths to an authentication category.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteCategory {
    Public,
    /// Endpoints that establish or destroy a session; always anonymous.
    AuthApi,
    Protected,
    /// Not in the catalog. Enforced like `Public`.
    Unknown,
}

const PROTECTED_EXACT: &[&str] = &["/profile", "/admin"];
const PROTECTED_PREFIX: &str = "/api/admin/";

const AUTH_API_EXACT: &[&str] = &[
    "/api/auth/exchange-code",
    "/api/auth/set-session",
    "/api/auth/logout",
    "/api/auth/validate",
    "/api/auth/user",
    "/api/auth/refresh",
];
const AUTH_API_PREFIX: &str = "/api/auth/";

const PUBLIC_EXACT: &[&str] = &["/", "/login", "/health"];
const PUBLIC_PREFIX: &str = "/auth/";

impl RouteCategory {
    /// Classifies `path`. Protected wins over auth-api, which wins over
    /// public.
    pub fn classify(path: &str) -> Self {
        if PROTECTED_EXACT.contains(&path) || path.starts_with(PROTECTED_PREFIX) {
            RouteCategory::Protected
        } else if AUTH_API_EXACT.contains(&path) || path.starts_with(AUTH_API_PREFIX) {
            RouteCategory::AuthApi
        } else if PUBLIC_EXACT.contains(&path) || path.starts_with(PUBLIC_PREFIX) {
            RouteCategory::Public
        } else {
            RouteCategory::Unknown
        }
    }

    pub fn requires_session(self) -> bool {
        matches!(self, RouteCategory::Protected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteCategory::Public => "public",
            RouteCategory::AuthApi => "auth_api",
            RouteCategory::Protected => "protected",
            RouteCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RouteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
