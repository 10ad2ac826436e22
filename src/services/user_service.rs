use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::{BackendError, UserProfile};

/// Looks up display profiles of users by id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, BackendError>;

    /// Number of profiles held in memory, if the directory caches.
    fn cached_entries(&self) -> u64 {
        0
    }
}

/// Caches found profiles of an inner directory.
///
/// Misses are not cached so that a user created after a failed join can
/// join right away.
pub struct CachedUserDirectory {
    inner: Arc<dyn UserDirectory>,
    cache: Cache<String, UserProfile>,
}

impl CachedUserDirectory {
    pub fn new(inner: Arc<dyn UserDirectory>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(ttl)
            .build();
        info!("User cache initialized");
        Self { inner, cache }
    }
}

#[async_trait]
impl UserDirectory for CachedUserDirectory {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, BackendError> {
        if let Some(profile) = self.cache.get(user_id).await {
            return Ok(Some(profile));
        }

        debug!("User cache miss for uid {}", user_id);
        let fetched = self.inner.find_user(user_id).await?;
        if let Some(profile) = &fetched {
            self.cache.insert(user_id.to_string(), profile.clone()).await;
        }
        Ok(fetched)
    }

    fn cached_entries(&self) -> u64 {
        self.cache.entry_count()
    }
}
