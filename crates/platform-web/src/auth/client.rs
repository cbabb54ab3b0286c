//! Typed client for the authentication microservice (AuthMS).
//!
//! Wire contract is JSON over HTTP:
//!
//! | Operation          | Endpoint                     |
//! |--------------------|------------------------------|
//! | `exchange_code`    | `POST /auth/session/create`  |
//! | `create_session`   | `POST /auth/session/create`  |
//! | `validate_session` | `POST /auth/session/refresh` |
//! | `get_user_info`    | `POST /auth/userinfo`        |
//! | `logout`           | `POST /auth/session/expire`  |
//!
//! Validation goes through the refresh endpoint; a rotated session id in the
//! response is ignored and the cookie keeps its current value.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{SessionGrant, SessionValidation, UserContext};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthClientError {
    #[error("Invalid authorization code: {0}")]
    InvalidCode(String),

    #[error("{0}")]
    Provider(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Auth service unreachable: {0}")]
    Transport(String),
}

impl AuthClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, AuthClientError::Transport(_))
    }
}

/// RPC surface of AuthMS consumed by the frontend.
///
/// Production uses [`HttpAuthClient`]; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthServiceClient: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<SessionGrant, AuthClientError>;

    /// Legacy name for [`AuthServiceClient::exchange_code`].
    async fn create_session(&self, auth_code: &str) -> Result<SessionGrant, AuthClientError>;

    /// Unknown or expired sessions come back as `valid = false`; only
    /// transport failures are errors.
    async fn validate_session(&self, session_id: &str)
        -> Result<SessionValidation, AuthClientError>;

    async fn get_user_info(&self, session_id: &str) -> Result<UserContext, AuthClientError>;

    /// Idempotent: expiring an unknown session succeeds.
    async fn logout(&self, session_id: &str) -> Result<(), AuthClientError>;
}

#[derive(Debug, Serialize)]
struct CodeRequest<'a> {
    auth_code: &'a str,
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    session_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct WireUserContext {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl From<WireUserContext> for UserContext {
    fn from(wire: WireUserContext) -> Self {
        UserContext {
            logged_in: true,
            user_id: wire.user_id.unwrap_or_default(),
            name: wire.name.unwrap_or_default(),
            email: wire.email.unwrap_or_default(),
            picture: wire.picture.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireResponse {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    user_context: Option<WireUserContext>,
    #[serde(default)]
    valid: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

impl WireResponse {
    fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }
}

/// AuthMS client over reqwest. Every call is bounded by the client timeout.
#[derive(Clone)]
pub struct HttpAuthClient {
    client: Client,
    base_url: String,
}

impl HttpAuthClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthClientError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(StatusCode, WireResponse), AuthClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(endpoint = path, "Calling auth service");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint = path, error = %e, "Auth service request failed");
                AuthClientError::Transport(e.to_string())
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            warn!(endpoint = path, error = %e, "Failed to read auth service response");
            AuthClientError::Transport(e.to_string())
        })?;

        let parsed = match serde_json::from_str::<WireResponse>(&text) {
            Ok(parsed) => parsed,
            Err(_) if status.is_success() => {
                warn!(endpoint = path, %status, "Auth service returned a malformed body");
                return Err(AuthClientError::Transport(
                    "malformed response from auth service".to_string(),
                ));
            }
            Err(_) => WireResponse {
                error: Some(non_empty_or(text.trim(), status)),
                ..Default::default()
            },
        };

        Ok((status, parsed))
    }
}

fn non_empty_or(text: &str, status: StatusCode) -> String {
    if text.is_empty() {
        format!("auth service returned {}", status)
    } else {
        text.to_string()
    }
}

#[async_trait]
impl AuthServiceClient for HttpAuthClient {
    async fn exchange_code(&self, code: &str) -> Result<SessionGrant, AuthClientError> {
        let (status, body) = self
            .post("/auth/session/create", &CodeRequest { auth_code: code })
            .await?;

        if status.is_server_error() {
            let message = body
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("auth service returned {}", status));
            return Err(AuthClientError::Provider(message));
        }

        if let Some(message) = body.error_message() {
            return Err(if status.is_client_error() {
                AuthClientError::InvalidCode(message.to_string())
            } else {
                AuthClientError::Provider(message.to_string())
            });
        }

        if !status.is_success() {
            return Err(AuthClientError::InvalidCode(format!(
                "auth service returned {}",
                status
            )));
        }

        let session_id = body
            .session_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthClientError::Provider("auth service returned no session".to_string()))?;

        Ok(SessionGrant {
            session_id,
            user: body.user_context.unwrap_or_default().into(),
        })
    }

    async fn create_session(&self, auth_code: &str) -> Result<SessionGrant, AuthClientError> {
        self.exchange_code(auth_code).await
    }

    async fn validate_session(
        &self,
        session_id: &str,
    ) -> Result<SessionValidation, AuthClientError> {
        let (status, body) = self
            .post("/auth/session/refresh", &SessionRequest { session_id })
            .await?;

        if status.is_server_error() {
            return Err(AuthClientError::Transport(format!(
                "auth service returned {}",
                status
            )));
        }

        if !status.is_success() || body.error_message().is_some() || body.valid == Some(false) {
            return Ok(SessionValidation::invalid());
        }

        Ok(match body.user_context {
            Some(user) => SessionValidation {
                valid: true,
                user: user.into(),
            },
            None => SessionValidation::invalid(),
        })
    }

    async fn get_user_info(&self, session_id: &str) -> Result<UserContext, AuthClientError> {
        let (status, body) = self
            .post("/auth/userinfo", &SessionRequest { session_id })
            .await?;

        if status.is_server_error() {
            return Err(AuthClientError::Transport(format!(
                "auth service returned {}",
                status
            )));
        }

        if !status.is_success() || body.error_message().is_some() {
            return Err(AuthClientError::NotAuthenticated);
        }

        body.user_context
            .map(UserContext::from)
            .ok_or(AuthClientError::NotAuthenticated)
    }

    async fn logout(&self, session_id: &str) -> Result<(), AuthClientError> {
        let (status, _) = self
            .post("/auth/session/expire", &SessionRequest { session_id })
            .await?;

        if status.is_server_error() {
            return Err(AuthClientError::Transport(format!(
                "auth service returned {}",
                status
            )));
        }

        Ok(())
    }
}
