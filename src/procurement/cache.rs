//! TTL cache of upstream response bodies.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Entry {
    body: String,
    stored_at: Instant,
}

/// A cached body together with its freshness at lookup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached {
    pub body: String,
    pub fresh: bool,
}

/// Bounded TTL cache. Once full, inserting a new key first drops expired entries,
/// then the oldest one.
pub struct ResponseCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a key. Expired entries are kept so they can serve as a stale fallback.
    pub async fn get_at(&self, key: &str, now: Instant) -> Option<Cached> {
        let entries = self.entries.lock().await;
        entries.get(key).map(|entry| Cached {
            body: entry.body.clone(),
            fresh: now.saturating_duration_since(entry.stored_at) < self.ttl,
        })
    }

    pub async fn get(&self, key: &str) -> Option<Cached> {
        self.get_at(key, Instant::now()).await
    }

    pub async fn insert_at(&self, key: &str, body: String, now: Instant) {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(
            key.to_string(),
            Entry {
                body,
                stored_at: now,
            },
        );
    }

    pub async fn insert(&self, key: &str, body: String) {
        self.insert_at(key, body, Instant::now()).await
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entry_older_than_ttl_is_stale() {
        let cache = ResponseCache::new(Duration::from_secs(1800), 16);
        let start = Instant::now();
        cache.insert_at("GET http://a/feed", "body".into(), start).await;

        let hit = cache
            .get_at("GET http://a/feed", start + Duration::from_secs(1799))
            .await
            .unwrap();
        assert!(hit.fresh);

        let stale = cache
            .get_at("GET http://a/feed", start + Duration::from_secs(1801))
            .await
            .unwrap();
        assert!(!stale.fresh);
        assert_eq!(stale.body, "body");

        assert!(cache.get_at("GET http://b/feed", start).await.is_none());
    }

    #[tokio::test]
    async fn test_insert_replaces_entry() {
        let cache = ResponseCache::new(Duration::from_secs(60), 16);
        let start = Instant::now();
        cache.insert_at("k", "old".into(), start).await;
        cache
            .insert_at("k", "new".into(), start + Duration::from_secs(120))
            .await;

        let hit = cache
            .get_at("k", start + Duration::from_secs(121))
            .await
            .unwrap();
        assert_eq!(hit, Cached { body: "new".into(), fresh: true });
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_full_cache_drops_expired_entries_first() {
        let cache = ResponseCache::new(Duration::from_secs(60), 3);
        let start = Instant::now();
        cache.insert_at("old-1", "a".into(), start).await;
        cache.insert_at("old-2", "b".into(), start).await;
        cache
            .insert_at("recent", "c".into(), start + Duration::from_secs(90))
            .await;

        cache
            .insert_at("new", "d".into(), start + Duration::from_secs(100))
            .await;

        let now = start + Duration::from_secs(100);
        assert_eq!(cache.len().await, 2);
        assert!(cache.get_at("old-1", now).await.is_none());
        assert!(cache.get_at("old-2", now).await.is_none());
        assert!(cache.get_at("recent", now).await.is_some());
        assert!(cache.get_at("new", now).await.is_some());
    }

    #[tokio::test]
    async fn test_distinct_keys_stay_within_capacity() {
        let cache = ResponseCache::new(Duration::from_secs(1800), 8);
        let start = Instant::now();
        for i in 0..100u64 {
            cache
                .insert_at(
                    &format!("POST http://grants/search {{\"keyword\":\"k{i}\"}}"),
                    "body".into(),
                    start + Duration::from_millis(i),
                )
                .await;
        }

        assert_eq!(cache.len().await, 8);
        let now = start + Duration::from_millis(100);
        assert!(cache
            .get_at("POST http://grants/search {\"keyword\":\"k99\"}", now)
            .await
            .is_some());
        assert!(cache
            .get_at("POST http://grants/search {\"keyword\":\"k0\"}", now)
            .await
            .is_none());
    }
}
