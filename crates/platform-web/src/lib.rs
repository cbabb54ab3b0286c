pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod handlers;
pub mod security;
pub mod state;
pub mod telemetry;
pub mod templates;
pub mod utils;

#[cfg(test)]
mod test;
