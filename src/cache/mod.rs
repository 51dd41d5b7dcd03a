// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Include-fetch caching.
//!
//! The cache is keyed by fetch URL.  A present, unexpired entry always
//! wins over a live fetch; the engine marks such hits with a synthetic
//! 304 status on the directive.  Implementations must be safe for
//! concurrent use – every include-fetch task may touch the cache.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// Capability set every cache implementation provides.
#[async_trait]
pub trait Cache: fmt::Debug + Send + Sync {
    /// Fetch the cached body for a URL, if present and unexpired.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a body under a URL with a lifetime in seconds.  A zero TTL
    /// falls back to the implementation's default lifetime.
    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> bool;

    /// Whether an unexpired entry exists for the URL.
    async fn exists(&self, key: &str) -> bool;

    /// Remaining lifetime of the entry, if present.  Entries stored
    /// without a lifetime report `Duration::MAX`.
    async fn ttl(&self, key: &str) -> Option<Duration>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process cache backed by a concurrent map with lazy expiry.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Option<Duration>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifetime applied to entries written with a zero TTL.
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl: Some(default_ttl),
        }
    }

    fn expiry_for(&self, ttl_secs: u64) -> Option<Instant> {
        let lifetime = if ttl_secs > 0 {
            Some(Duration::from_secs(ttl_secs))
        } else {
            self.default_ttl
        };
        lifetime.map(|d| Instant::now() + d)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.expired() {
                return Some(entry.value.clone());
            }
        }
        // Expired entries are evicted on access
        self.entries.remove_if(key, |_, entry| entry.expired());
        None
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> bool {
        let entry = CacheEntry {
            value,
            expires_at: self.expiry_for(ttl_secs),
        };
        self.entries.insert(key.to_string(), entry);
        true
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    async fn ttl(&self, key: &str) -> Option<Duration> {
        let entry = self.entries.get(key)?;
        match entry.expires_at {
            Some(at) => {
                let now = Instant::now();
                if now >= at {
                    None
                } else {
                    Some(at - now)
                }
            }
            None => Some(Duration::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new();
        assert!(cache.set("http://x/frag", "<b>world</b>".into(), 60).await);
        assert_eq!(
            cache.get("http://x/frag").await.as_deref(),
            Some("<b>world</b>")
        );
        assert!(cache.exists("http://x/frag").await);
    }

    #[tokio::test]
    async fn test_miss_on_unknown_key() {
        let cache = MemoryCache::new();
        assert!(cache.get("http://x/frag").await.is_none());
        assert!(!cache.exists("http://x/frag").await);
        assert!(cache.ttl("http://x/frag").await.is_none());
    }

    #[tokio::test]
    async fn test_ttl_counts_down() {
        let cache = MemoryCache::new();
        cache.set("k", "v".into(), 60).await;
        let remaining = cache.ttl("k").await.unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(58));
    }

    #[tokio::test]
    async fn test_zero_ttl_without_default_never_expires() {
        let cache = MemoryCache::new();
        cache.set("k", "v".into(), 0).await;
        assert_eq!(cache.ttl("k").await, Some(Duration::MAX));
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_zero_ttl_uses_default_lifetime() {
        let cache = MemoryCache::with_default_ttl(Duration::from_secs(30));
        cache.set("k", "v".into(), 0).await;
        let remaining = cache.ttl("k").await.unwrap();
        assert!(remaining <= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let cache = MemoryCache::new();
        cache.set("k", "v".into(), 1).await;
        assert!(cache.exists("k").await);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(cache.get("k").await.is_none());
        assert!(cache.ttl("k").await.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_refreshes_entry() {
        let cache = MemoryCache::new();
        cache.set("k", "old".into(), 60).await;
        cache.set("k", "new".into(), 60).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("new"));
    }
}
