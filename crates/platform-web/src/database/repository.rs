use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use super::UserRecord;
use crate::auth::UserContext;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Query surface over the `users` table.
///
/// Queries run inside the calling request's task; dropping that future (client
/// disconnect, handler exit) aborts the query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;

    async fn get_all_users(&self) -> Result<Vec<UserRecord>, RepositoryError>;

    /// Newest first by `created_at`. `limit` is clamped to 1..=10.
    async fn get_recent_users(&self, limit: i64) -> Result<Vec<UserRecord>, RepositoryError>;

    async fn count_users(&self) -> Result<i64, RepositoryError>;

    async fn count_users_created_today(&self) -> Result<i64, RepositoryError>;

    async fn count_users_created_this_week(&self) -> Result<i64, RepositoryError>;

    /// Inserts the user on first sight, otherwise refreshes name, picture and
    /// `updated_at`. `is_admin` only applies to new rows.
    async fn upsert_user(
        &self,
        user: &UserContext,
        is_admin: bool,
    ) -> Result<UserRecord, RepositoryError>;
}

const USER_COLUMNS: &str = "id, email, name, picture, is_admin, created_at, updated_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str, what: &str) -> Result<i64, RepositoryError> {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting {}: {}", what, e);
                RepositoryError::from(e)
            })
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding user by email: {}", e);
                RepositoryError::from(e)
            })?;

        Ok(user)
    }

    async fn get_all_users(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
        let users = sqlx::query_as::<_, UserRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing users: {}", e);
                RepositoryError::from(e)
            })?;

        debug!("Loaded {} users", users.len());
        Ok(users)
    }

    async fn get_recent_users(&self, limit: i64) -> Result<Vec<UserRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT $1",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(limit.clamp(1, 10))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing recent users: {}", e);
                RepositoryError::from(e)
            })?;

        Ok(users)
    }

    async fn count_users(&self) -> Result<i64, RepositoryError> {
        self.count("SELECT COUNT(*) FROM users", "users").await
    }

    async fn count_users_created_today(&self) -> Result<i64, RepositoryError> {
        self.count(
            "SELECT COUNT(*) FROM users WHERE created_at >= date_trunc('day', NOW())",
            "today's signups",
        )
        .await
    }

    async fn count_users_created_this_week(&self) -> Result<i64, RepositoryError> {
        self.count(
            "SELECT COUNT(*) FROM users WHERE created_at >= date_trunc('week', NOW())",
            "this week's signups",
        )
        .await
    }

    async fn upsert_user(
        &self,
        user: &UserContext,
        is_admin: bool,
    ) -> Result<UserRecord, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, name, picture, is_admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (email) DO UPDATE
                SET name = EXCLUDED.name,
                    picture = EXCLUDED.picture,
                    updated_at = NOW()
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.email.trim().to_lowercase())
            .bind(&user.name)
            .bind(&user.picture)
            .bind(is_admin)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error upserting user: {}", e);
                RepositoryError::from(e)
            })?;

        Ok(record)
    }
}
