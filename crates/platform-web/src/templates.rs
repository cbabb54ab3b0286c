//! Server-side page rendering with Handlebars.
//!
//! Templates are embedded at compile time and registered once at startup.

use axum::response::Html;
use handlebars::{Handlebars, TemplateError};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::auth::UserContext;
use crate::utils::error::ApiError;

const PARTIALS: &[(&str, &str)] = &[
    ("header", include_str!("../templates/partials/header.hbs")),
    ("nav", include_str!("../templates/partials/nav.hbs")),
    ("footer", include_str!("../templates/partials/footer.hbs")),
];

const PAGES: &[(&str, &str)] = &[
    ("home", include_str!("../templates/home.hbs")),
    ("login", include_str!("../templates/login.hbs")),
    ("profile", include_str!("../templates/profile.hbs")),
    ("admin", include_str!("../templates/admin.hbs")),
    ("callback", include_str!("../templates/callback.hbs")),
];

pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);

        for (name, source) in PARTIALS {
            registry.register_partial(name, *source)?;
        }
        for (name, source) in PAGES {
            registry.register_template_string(name, *source)?;
        }

        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<Html<String>, ApiError> {
        self.registry.render(name, data).map(Html).map_err(|e| {
            error!(template = name, error = %e, "Template rendering failed");
            ApiError::from(e)
        })
    }
}

/// Data every page template expects: title, the request's user context and
/// the name to greet them with.
pub fn page_data(title: &str, user: &UserContext) -> Value {
    json!({
        "title": title,
        "user": user,
        "display_name": user.display_name(),
    })
}
