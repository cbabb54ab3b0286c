use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::UserContext;
use crate::config::AdminConfig;
use crate::database::{UserRecord, UserRepository};
use crate::utils::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    Online,
    Offline,
}

/// Outcome of a successful admin check.
#[derive(Debug, Clone)]
pub struct AdminGrant {
    /// The admin's row; `None` when access came from the `ADMIN_EMAIL`
    /// fallback.
    pub record: Option<UserRecord>,
    pub system_health: SystemHealth,
}

/// Admin authorization against freshly-read persistent state.
///
/// The database `is_admin` column is the source of truth and is read on every
/// call. Only when the database is absent or failing does an explicitly
/// configured `ADMIN_EMAIL` grant access.
#[derive(Clone)]
pub struct AdminAuthorization {
    users: Option<Arc<dyn UserRepository>>,
    fallback_email: Option<String>,
}

impl AdminAuthorization {
    pub fn new(users: Option<Arc<dyn UserRepository>>, admin: &AdminConfig) -> Self {
        Self {
            users,
            fallback_email: admin.email_configured.then(|| admin.email.clone()),
        }
    }

    pub async fn require_admin(&self, user: &UserContext) -> Result<AdminGrant, ApiError> {
        if !user.logged_in || user.email.is_empty() {
            return Err(ApiError::Forbidden);
        }

        let Some(users) = &self.users else {
            return self.fallback(user);
        };

        match users.get_user_by_email(&user.email).await {
            Ok(Some(record)) if record.is_admin => {
                debug!(email = %user.email, "Admin access granted");
                Ok(AdminGrant {
                    record: Some(record),
                    system_health: SystemHealth::Online,
                })
            }
            Ok(Some(_)) => {
                warn!(email = %user.email, "Admin access denied: not an admin");
                Err(ApiError::Forbidden)
            }
            Ok(None) => {
                warn!(email = %user.email, "Admin access denied: no user record");
                Err(ApiError::Forbidden)
            }
            Err(e) => {
                warn!(email = %user.email, error = %e, "Admin lookup failed; using fallback");
                self.fallback(user)
            }
        }
    }

    /// Non-failing variant for navigation: whether `user` would pass
    /// [`require_admin`](Self::require_admin). Denials are not logged.
    pub async fn is_admin(&self, user: &UserContext) -> bool {
        if !user.logged_in || user.email.is_empty() {
            return false;
        }

        let lookup = match &self.users {
            Some(users) => users.get_user_by_email(&user.email).await,
            None => return self.fallback_matches(user),
        };

        match lookup {
            Ok(record) => record.is_some_and(|r| r.is_admin),
            Err(e) => {
                debug!(error = %e, "Admin lookup failed for navigation");
                self.fallback_matches(user)
            }
        }
    }

    fn fallback_matches(&self, user: &UserContext) -> bool {
        self.fallback_email
            .as_deref()
            .is_some_and(|email| email.eq_ignore_ascii_case(&user.email))
    }

    fn fallback(&self, user: &UserContext) -> Result<AdminGrant, ApiError> {
        if self.fallback_matches(user) {
            debug!(email = %user.email, "Admin access granted by configured fallback");
            Ok(AdminGrant {
                record: None,
                system_health: SystemHealth::Offline,
            })
        } else {
            warn!(email = %user.email, "Admin access denied: database unavailable");
            Err(ApiError::Forbidden)
        }
    }
}
