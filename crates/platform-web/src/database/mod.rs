pub mod models;
pub mod pool;
pub mod repository;

pub use models::UserRecord;
pub use pool::DbPool;
pub use repository::{PgUserRepository, RepositoryError, UserRepository};

#[cfg(test)]
pub use repository::MockUserRepository;
