pub mod settings;

pub use settings::{
    AdminConfig, AuthServiceConfig, DatabaseConfig, ServerConfig, SessionConfig, Settings,
};
