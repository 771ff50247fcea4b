use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::metrics::{record_cache_hit, record_cache_miss, record_cache_tier_error};
use crate::stores::CacheTier;
use crate::utils::clock::Clock;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEnvelope<T> {
    value: T,
    cached_at: DateTime<Utc>,
    version: String,
}

/// Snapshot of a cache for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub name: String,
    pub has_value: bool,
    pub fresh: bool,
    pub cached_at: Option<DateTime<Utc>>,
    pub age_seconds: Option<i64>,
    pub ttl_seconds: u64,
    pub version: String,
    pub shared_tier: bool,
}

/// Single-value cache with a fixed time-to-live and a version tag.
///
/// Entries live in process memory and, when a shared tier is attached, as a
/// JSON envelope in that tier too. Entries written under another version are
/// ignored. Shared tier failures are logged and read as misses.
pub struct ExpiringCache<T> {
    name: &'static str,
    ttl_seconds: u64,
    version: String,
    clock: Arc<dyn Clock>,
    memory: RwLock<Option<CacheEnvelope<T>>>,
    tier: Option<Arc<dyn CacheTier>>,
}

impl<T> ExpiringCache<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(
        name: &'static str,
        ttl_seconds: u64,
        version: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name,
            ttl_seconds,
            version: version.into(),
            clock,
            memory: RwLock::new(None),
            tier: None,
        }
    }

    pub fn with_tier(mut self, tier: Option<Arc<dyn CacheTier>>) -> Self {
        self.tier = tier;
        self
    }

    fn is_current(&self, envelope: &CacheEnvelope<T>) -> bool {
        envelope.version == self.version
    }

    fn is_fresh(&self, envelope: &CacheEnvelope<T>) -> bool {
        let age = self.clock.now() - envelope.cached_at;
        self.is_current(envelope) && age < Duration::seconds(self.ttl_seconds as i64)
    }

    async fn load_shared(&self) -> Option<CacheEnvelope<T>> {
        let tier = self.tier.as_ref()?;
        let payload = match tier.load(self.name).await {
            Ok(payload) => payload?,
            Err(e) => {
                tracing::warn!("Shared cache read failed for {}: {}", self.name, e);
                record_cache_tier_error("load");
                return None;
            }
        };

        match serde_json::from_str::<CacheEnvelope<T>>(&payload) {
            Ok(envelope) if self.is_current(&envelope) => Some(envelope),
            Ok(envelope) => {
                tracing::debug!(
                    "Ignoring shared {} entry with version {} (want {})",
                    self.name,
                    envelope.version,
                    self.version
                );
                None
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable shared {} entry: {}", self.name, e);
                None
            }
        }
    }

    /// Fresh value, if any. Shared tier hits are copied into memory.
    pub async fn get(&self) -> Option<T> {
        if let Some(envelope) = self.memory.read().await.as_ref() {
            if self.is_fresh(envelope) {
                record_cache_hit(self.name);
                return Some(envelope.value.clone());
            }
        }

        if let Some(envelope) = self.load_shared().await {
            if self.is_fresh(&envelope) {
                record_cache_hit(self.name);
                let value = envelope.value.clone();
                *self.memory.write().await = Some(envelope);
                return Some(value);
            }
        }

        record_cache_miss(self.name);
        None
    }

    /// Last stored value regardless of age, for when the source is down.
    pub async fn get_stale(&self) -> Option<T> {
        if let Some(envelope) = self.memory.read().await.as_ref() {
            if self.is_current(envelope) {
                return Some(envelope.value.clone());
            }
        }
        self.load_shared().await.map(|envelope| envelope.value)
    }

    pub async fn put(&self, value: T) {
        let envelope = CacheEnvelope {
            value,
            cached_at: self.clock.now(),
            version: self.version.clone(),
        };

        if let Some(tier) = &self.tier {
            match serde_json::to_string(&envelope) {
                Ok(payload) => {
                    if let Err(e) = tier.store(self.name, &payload, self.ttl_seconds).await {
                        tracing::warn!("Shared cache write failed for {}: {}", self.name, e);
                        record_cache_tier_error("store");
                    }
                }
                Err(e) => tracing::warn!("Could not serialize {} for caching: {}", self.name, e),
            }
        }

        *self.memory.write().await = Some(envelope);
    }

    pub async fn invalidate(&self) {
        *self.memory.write().await = None;
        if let Some(tier) = &self.tier {
            if let Err(e) = tier.clear(self.name).await {
                tracing::warn!("Shared cache clear failed for {}: {}", self.name, e);
                record_cache_tier_error("clear");
            }
        }
        tracing::info!("Cache {} invalidated", self.name);
    }

    pub async fn info(&self) -> CacheInfo {
        let memory = self.memory.read().await;
        let now = self.clock.now();
        CacheInfo {
            name: self.name.to_string(),
            has_value: memory.is_some(),
            fresh: memory.as_ref().is_some_and(|e| self.is_fresh(e)),
            cached_at: memory.as_ref().map(|e| e.cached_at),
            age_seconds: memory.as_ref().map(|e| (now - e.cached_at).num_seconds()),
            ttl_seconds: self.ttl_seconds,
            version: self.version.clone(),
            shared_tier: self.tier.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryCacheTier;
    use crate::utils::clock::ManualClock;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn value_expires_after_ttl_but_stays_available_stale() {
        let clock = clock();
        let cache: ExpiringCache<Vec<u32>> = ExpiringCache::new("test", 60, "1", clock.clone());

        assert_eq!(cache.get().await, None);
        cache.put(vec![1, 2]).await;
        assert_eq!(cache.get().await, Some(vec![1, 2]));

        clock.advance(Duration::seconds(59));
        assert!(cache.get().await.is_some());

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get().await, None);
        assert_eq!(cache.get_stale().await, Some(vec![1, 2]));

        let info = cache.info().await;
        assert!(info.has_value);
        assert!(!info.fresh);
        assert_eq!(info.age_seconds, Some(60));
    }

    #[tokio::test]
    async fn invalidate_clears_memory_and_shared_tier() {
        let tier = Arc::new(MemoryCacheTier::new());
        let cache: ExpiringCache<String> = ExpiringCache::new("test", 60, "1", clock())
            .with_tier(Some(tier.clone() as Arc<dyn CacheTier>));

        cache.put("pool".to_string()).await;
        assert!(tier.load("test").await.unwrap().is_some());

        cache.invalidate().await;
        assert_eq!(cache.get().await, None);
        assert_eq!(cache.get_stale().await, None);
        assert!(tier.load("test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn shared_tier_hit_is_promoted_into_memory() {
        let clock = clock();
        let tier = Arc::new(MemoryCacheTier::new());
        let writer: ExpiringCache<String> = ExpiringCache::new("test", 60, "1", clock.clone())
            .with_tier(Some(tier.clone() as Arc<dyn CacheTier>));
        writer.put("shared".to_string()).await;

        let reader: ExpiringCache<String> = ExpiringCache::new("test", 60, "1", clock.clone())
            .with_tier(Some(tier.clone() as Arc<dyn CacheTier>));
        assert_eq!(reader.get().await.as_deref(), Some("shared"));

        tier.set_failing(true);
        assert_eq!(reader.get().await.as_deref(), Some("shared"));
    }

    #[tokio::test]
    async fn other_versions_are_misses() {
        let clock = clock();
        let tier = Arc::new(MemoryCacheTier::new());
        let old: ExpiringCache<String> = ExpiringCache::new("test", 60, "1.0", clock.clone())
            .with_tier(Some(tier.clone() as Arc<dyn CacheTier>));
        old.put("old".to_string()).await;

        let current: ExpiringCache<String> = ExpiringCache::new("test", 60, "2.0", clock)
            .with_tier(Some(tier as Arc<dyn CacheTier>));
        assert_eq!(current.get().await, None);
        assert_eq!(current.get_stale().await, None);
    }

    #[tokio::test]
    async fn failing_tier_degrades_to_memory_only() {
        let tier = Arc::new(MemoryCacheTier::new());
        tier.set_failing(true);
        let cache: ExpiringCache<u32> = ExpiringCache::new("test", 60, "1", clock())
            .with_tier(Some(tier as Arc<dyn CacheTier>));

        cache.put(7).await;
        assert_eq!(cache.get().await, Some(7));
        cache.invalidate().await;
        assert_eq!(cache.get().await, None);
    }
}
