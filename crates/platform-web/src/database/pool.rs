use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;

const SCHEMA_RETRY_INITIAL: Duration = Duration::from_secs(1);
const SCHEMA_RETRY_MAX: Duration = Duration::from_secs(60);

pub struct DbPool {
    pool: PgPool,
    schema_ready: Arc<AtomicBool>,
    schema_task: Option<JoinHandle<()>>,
}

impl DbPool {
    /// Connects and applies the schema. When Postgres is unreachable the pool
    /// is created lazily instead, so the server still starts and queries fail
    /// (and later recover) per request. If the schema could not be applied
    /// now, a background task keeps retrying until it is.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(config.max_lifetime)
            .idle_timeout(Duration::from_secs(60))
            .acquire_timeout(config.acquire_timeout);

        let (pool, reachable) = match options.clone().connect(&config.url).await {
            Ok(pool) => {
                info!(
                    max_connections = config.max_connections,
                    min_connections = config.min_connections,
                    "Database connection established"
                );
                (pool, true)
            }
            Err(e) => {
                warn!(error = %e, "Database unreachable at startup; continuing with a lazy pool");
                (options.connect_lazy(&config.url)?, false)
            }
        };

        let schema_ready = Arc::new(AtomicBool::new(false));
        let schema_task = if reachable && apply_schema(&pool).await {
            schema_ready.store(true, Ordering::Release);
            None
        } else {
            Some(spawn_schema_retry(pool.clone(), schema_ready.clone()))
        };

        Ok(Self {
            pool,
            schema_ready,
            schema_task,
        })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// True once the `users` schema has been applied.
    pub fn schema_ready(&self) -> bool {
        self.schema_ready.load(Ordering::Acquire)
    }

    pub async fn close(&self) {
        if let Some(task) = &self.schema_task {
            task.abort();
        }
        self.pool.close().await;
    }
}

async fn apply_schema(pool: &PgPool) -> bool {
    match sqlx::migrate!().run(pool).await {
        Ok(()) => {
            info!("Database schema applied");
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to apply database schema");
            false
        }
    }
}

/// Delay before retry number `attempt` (0-based): 1 s doubling, capped at 60 s.
fn schema_retry_delay(attempt: u32) -> Duration {
    SCHEMA_RETRY_INITIAL
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(SCHEMA_RETRY_MAX)
}

fn spawn_schema_retry(pool: PgPool, ready: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut attempt = 0;
        loop {
            tokio::time::sleep(schema_retry_delay(attempt)).await;
            if apply_schema(&pool).await {
                ready.store(true, Ordering::Release);
                return;
            }
            attempt = attempt.saturating_add(1);
        }
    })
}
