use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::types::UserContext;

#[derive(Debug, Clone)]
struct CacheEntry {
    user: UserContext,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Thread-safe session id -> user context cache with a fixed TTL.
///
/// Backed by DashMap (sharded read/write locks), so concurrent readers never
/// observe a torn entry. Only successful validations are stored.
#[derive(Clone)]
pub struct SessionCache {
    storage: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        info!("Initializing session cache (ttl: {:?})", ttl);
        Self {
            storage: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached context for `session_id`, or `None` if absent or expired.
    /// Expired entries are evicted on the way out.
    pub fn get(&self, session_id: &str) -> Option<UserContext> {
        let entry = self.storage.get(session_id)?;

        if entry.is_expired(Instant::now()) {
            drop(entry); // Release read lock
            self.storage
                .remove_if(session_id, |_, e| e.is_expired(Instant::now()));
            debug!("Session cache entry expired, evicted");
            return None;
        }

        Some(entry.user.clone())
    }

    pub fn set(&self, session_id: &str, user: UserContext) {
        self.storage.insert(
            session_id.to_string(),
            CacheEntry {
                user,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn remove(&self, session_id: &str) -> Option<UserContext> {
        self.storage.remove(session_id).map(|(_, entry)| entry.user)
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Drops every expired entry. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let start_len = self.storage.len();
        self.storage.retain(|_, entry| !entry.is_expired(now));
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            debug!("Swept {} expired session cache entries", count);
        }

        count
    }

    /// Periodically sweeps expired entries. Abort the handle on shutdown.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                cache.sweep_expired();
            }
        })
    }
}
