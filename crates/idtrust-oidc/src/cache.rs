//! JWKS cache
//!
//! Raw JWKS bodies keyed by issuer. Entries expire a fixed time after they were
//! written and the cache is bounded by the total size of the stored bodies. The
//! cache only saves round trips: a failed write is logged by the caller and
//! verification proceeds with the freshly fetched set.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The entry alone is larger than the cache
    #[error("entry of {size} bytes exceeds cache capacity of {capacity} bytes")]
    TooLarge { size: u64, capacity: u64 },
}

/// Concurrent issuer to JWKS cache
#[async_trait]
pub trait JwksCache: Send + Sync {
    async fn get(&self, issuer: &str) -> Option<Arc<str>>;

    async fn insert(&self, issuer: &str, jwks: Arc<str>) -> Result<(), CacheError>;

    async fn invalidate(&self, issuer: &str);
}

/// [`JwksCache`] backed by a size-weighted `moka` cache with a time to live
#[derive(Debug, Clone)]
pub struct MokaJwksCache {
    inner: Cache<String, Arc<str>>,
    capacity: u64,
}

impl MokaJwksCache {
    pub fn new(ttl: Duration, max_bytes: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|issuer: &String, jwks: &Arc<str>| {
                u32::try_from(issuer.len() + jwks.len()).unwrap_or(u32::MAX)
            })
            .time_to_live(ttl)
            .build();
        Self {
            inner,
            capacity: max_bytes,
        }
    }

    /// Number of live entries, after pending maintenance has run
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

#[async_trait]
impl JwksCache for MokaJwksCache {
    async fn get(&self, issuer: &str) -> Option<Arc<str>> {
        self.inner.get(issuer).await
    }

    async fn insert(&self, issuer: &str, jwks: Arc<str>) -> Result<(), CacheError> {
        let size = (issuer.len() + jwks.len()) as u64;
        if size > self.capacity {
            return Err(CacheError::TooLarge {
                size,
                capacity: self.capacity,
            });
        }
        self.inner.insert(issuer.to_owned(), jwks).await;
        Ok(())
    }

    async fn invalidate(&self, issuer: &str) {
        self.inner.invalidate(issuer).await;
    }
}
