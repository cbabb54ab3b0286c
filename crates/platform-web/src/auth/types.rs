use serde::{Deserialize, Serialize};

/// Identity resolved for the current request.
///
/// Produced once by the auth middleware and read by handlers and templates.
/// The anonymous context (`UserContext::anonymous()`) has `logged_in = false`
/// and empty strings everywhere else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub picture: String,
}

impl UserContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Name to greet the user with; falls back to the email address.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Result of a code exchange: the AuthMS-minted session id plus the user it
/// belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub session_id: String,
    pub user: UserContext,
}

/// Result of validating a session id against AuthMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionValidation {
    pub valid: bool,
    pub user: UserContext,
}

impl SessionValidation {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            user: UserContext::anonymous(),
        }
    }
}
