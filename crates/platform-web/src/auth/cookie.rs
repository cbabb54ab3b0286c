use axum::http::{header, HeaderMap, HeaderValue};
use cookie::Cookie;
use thiserror::Error;

pub const SESSION_COOKIE: &str = "session_id";

/// 30 days.
pub const SESSION_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CookieError {
    #[error("Invalid session ID")]
    InvalidValue,
}

/// Reads and writes the `session_id` cookie.
///
/// Every write path goes through [`SessionCookies::session_cookie`] or
/// [`SessionCookies::removal_cookie`] so the attributes (`Path=/`,
/// `HttpOnly`, `Secure` from configuration) never drift between set and
/// clear.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookies {
    secure: bool,
}

impl SessionCookies {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Session id from the request's `Cookie` headers, if present and
    /// non-empty.
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
            .map(|c| c.value().to_string())
    }

    pub fn session_cookie(&self, session_id: &str) -> Cookie<'static> {
        self.build(session_id.to_string(), SESSION_MAX_AGE_SECS)
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        self.build(String::new(), -1)
    }

    /// Appends `Set-Cookie: session_id=<id>` to the response headers.
    pub fn set(&self, headers: &mut HeaderMap, session_id: &str) -> Result<(), CookieError> {
        if !is_cookie_value(session_id) {
            return Err(CookieError::InvalidValue);
        }
        append(headers, &self.session_cookie(session_id))
    }

    /// Appends an already-expired `session_id` cookie.
    pub fn clear(&self, headers: &mut HeaderMap) -> Result<(), CookieError> {
        append(headers, &self.removal_cookie())
    }

    fn build(&self, value: String, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .max_age(time::Duration::seconds(max_age_secs))
            .build()
    }
}

fn append(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> Result<(), CookieError> {
    let value =
        HeaderValue::from_str(&cookie.to_string()).map_err(|_| CookieError::InvalidValue)?;
    headers.append(header::SET_COOKIE, value);
    Ok(())
}

/// RFC 6265 `cookie-octet`s only, non-empty.
fn is_cookie_value(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
        })
}
