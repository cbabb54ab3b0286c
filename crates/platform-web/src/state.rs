use std::sync::Arc;

use handlebars::TemplateError;

use crate::auth::{AuthServiceClient, SessionCache, SessionCookies};
use crate::config::Settings;
use crate::database::UserRepository;
use crate::security::AdminAuthorization;
use crate::templates::Templates;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub auth_client: Arc<dyn AuthServiceClient>,
    pub session_cache: SessionCache,
    pub cookies: SessionCookies,
    /// `None` when no database is configured.
    pub users: Option<Arc<dyn UserRepository>>,
    pub admin_auth: AdminAuthorization,
    pub templates: Arc<Templates>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        auth_client: Arc<dyn AuthServiceClient>,
        users: Option<Arc<dyn UserRepository>>,
    ) -> Result<Self, TemplateError> {
        let session_cache = SessionCache::new(settings.session.cache_ttl);
        let cookies = SessionCookies::new(settings.session.secure_cookies);
        let admin_auth = AdminAuthorization::new(users.clone(), &settings.admin);
        let templates = Arc::new(Templates::new()?);

        Ok(Self {
            settings: Arc::new(settings),
            auth_client,
            session_cache,
            cookies,
            users,
            admin_auth,
            templates,
        })
    }
}
