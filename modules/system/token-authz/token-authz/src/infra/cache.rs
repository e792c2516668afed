//! In-process token → payload store.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::CacheExpiry;
use crate::domain::DomainError;
use crate::domain::ports::CacheStore;

struct CachedPayload {
    value: String,
    stored_at: Instant,
}

/// `DashMap`-backed cache. Entries never expire unless the policy says so,
/// and an expired entry reads as absent.
pub struct MemoryCacheStore {
    entries: DashMap<String, CachedPayload>,
    expiry: CacheExpiry,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new(expiry: CacheExpiry) -> Self {
        Self {
            entries: DashMap::new(),
            expiry,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CachedPayload) -> bool {
        match self.expiry {
            CacheExpiry::Never => false,
            CacheExpiry::After { ttl } => entry.stored_at.elapsed() >= ttl,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        if let Some(entry) = self.entries.get(key) {
            if !self.is_expired(&entry) {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }

        self.entries.remove_if(key, |_, entry| self.is_expired(entry));
        tracing::trace!("cached payload expired");
        Ok(None)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), DomainError> {
        self.entries.insert(
            key.to_owned(),
            CachedPayload {
                value,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }
}
