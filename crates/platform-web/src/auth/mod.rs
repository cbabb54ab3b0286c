//! Session plumbing: the AuthMS client, the session cookie, the short-lived
//! session cache, the route catalog, and the middleware that ties them
//! together on every request.

pub mod client;
pub mod cookie;
pub mod middleware;
pub mod routes;
pub mod session_cache;
pub mod types;

pub use client::{AuthClientError, AuthServiceClient, HttpAuthClient};
pub use cookie::{SessionCookies, SESSION_COOKIE};
pub use middleware::auth_middleware;
pub use routes::RouteCategory;
pub use session_cache::SessionCache;
pub use types::{SessionGrant, SessionValidation, UserContext};
