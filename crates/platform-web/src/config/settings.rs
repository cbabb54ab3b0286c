use config::{Config, ConfigError, Environment, Map};
use reqwest::Url;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@startup-platform.local";

/// Bundled assets; independent of the working directory.
pub const DEFAULT_STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub auth: AuthServiceConfig,
    pub session: SessionConfig,
    pub admin: AdminConfig,
    /// `None` when `DB_URL` is unset; database features are then disabled.
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub base_url: String,
    pub redirect_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cache_ttl: Duration,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub email: String,
    /// True only when `ADMIN_EMAIL` was set explicitly.
    pub email_configured: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
}

/// Flat view of the environment, one field per variable.
#[derive(Debug, Deserialize)]
struct EnvSettings {
    bind_host: String,
    port: u16,
    auth_service_url: String,
    redirect_url: String,
    #[serde(default)]
    admin_email: Option<String>,
    #[serde(default)]
    db_url: Option<String>,
    app_env: String,
    #[serde(default)]
    cookie_secure: Option<bool>,
    session_cache_ttl_seconds: u64,
    auth_timeout_seconds: u64,
    db_max_connections: u32,
    db_min_connections: u32,
    db_max_lifetime_seconds: u64,
    static_dir: String,
}

impl Settings {
    /// Loads `.env` (if any) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(Environment::default().try_parsing(true))
    }

    /// Builds settings from an explicit variable map instead of the process
    /// environment.
    pub fn from_map(vars: Map<String, String>) -> Result<Self, ConfigError> {
        Self::build(Environment::default().try_parsing(true).source(Some(vars)))
    }

    fn build(environment: Environment) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("bind_host", "0.0.0.0")?
            .set_default("port", 8081)?
            .set_default("auth_service_url", "http://localhost:8080")?
            .set_default("redirect_url", "http://localhost:8081")?
            .set_default("app_env", "development")?
            .set_default("session_cache_ttl_seconds", 15)?
            .set_default("auth_timeout_seconds", 10)?
            .set_default("db_max_connections", 25)?
            .set_default("db_min_connections", 10)?
            .set_default("db_max_lifetime_seconds", 300)?
            .set_default("static_dir", DEFAULT_STATIC_DIR)?
            .add_source(environment)
            .build()?;

        let env: EnvSettings = config.try_deserialize()?;
        Self::from_env(env)
    }

    fn from_env(env: EnvSettings) -> Result<Self, ConfigError> {
        let auth_service_url = normalize_url("AUTH_SERVICE_URL", &env.auth_service_url)?;
        let redirect_url = normalize_url("REDIRECT_URL", &env.redirect_url)?;

        let production = env.app_env.eq_ignore_ascii_case("production");
        let secure_cookies = env.cookie_secure.unwrap_or(production);

        let admin_email = non_empty(env.admin_email);
        let database = non_empty(env.db_url).map(|url| DatabaseConfig {
            url,
            max_connections: env.db_max_connections.max(1),
            min_connections: env.db_min_connections.min(env.db_max_connections),
            max_lifetime: Duration::from_secs(env.db_max_lifetime_seconds),
            acquire_timeout: Duration::from_secs(3),
        });

        Ok(Self {
            server: ServerConfig {
                host: env.bind_host,
                port: env.port,
                static_dir: env.static_dir,
                request_timeout: Duration::from_secs(30),
                shutdown_grace: Duration::from_secs(10),
            },
            auth: AuthServiceConfig {
                base_url: auth_service_url,
                redirect_url,
                timeout: Duration::from_secs(env.auth_timeout_seconds),
            },
            session: SessionConfig {
                cache_ttl: Duration::from_secs(env.session_cache_ttl_seconds),
                secure_cookies,
            },
            admin: AdminConfig {
                email_configured: admin_email.is_some(),
                email: admin_email.unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string()),
            },
            database,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host: std::net::IpAddr = self
            .server
            .host
            .parse()
            .map_err(|e| ConfigError::Message(format!("invalid BIND_HOST: {}", e)))?;
        Ok(SocketAddr::from((host, self.server.port)))
    }

    pub fn database_enabled(&self) -> bool {
        self.database.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_url(name: &str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    Url::parse(trimmed).map_err(|e| ConfigError::Message(format!("invalid {}: {}", name, e)))?;
    Ok(trimmed.to_string())
}
