pub mod authorization;

pub use authorization::{AdminAuthorization, AdminGrant, SystemHealth};
