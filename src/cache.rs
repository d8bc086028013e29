//! # Keyed Lookup Cache
//! In-memory, size- and age-bounded map from a hashed request key to a
//! previously computed lookup result.
//!
//! - Keys are SHA-256 digests of the normalized request parameters.
//! - Absolute TTL measured from insertion; a hit never returns an older entry.
//! - When full, the least-recently-inserted entry is evicted (insertion order,
//!   not access order).
//! - One mutex guards the map. It is never held across the fetch future.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::clock::SharedClock;

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_TTL_SECS: u64 = 24 * 3600;
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 3600;

/// Value plus a flag telling whether it came out of the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    pub cached: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub ttl_seconds: u64,
    pub ttl_hours: u64,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    /// Keys in insertion order, oldest at the front.
    order: VecDeque<String>,
}

pub struct LookupCache<V> {
    name: &'static str,
    inner: Mutex<Inner<V>>,
    capacity: usize,
    ttl: Duration,
    clock: SharedClock,
}

/// Stable key for a set of request parameters (trimmed, lower-cased).
pub fn cache_key(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(p.trim().to_lowercase().as_bytes());
    }
    hex::encode(hasher.finalize())
}

impl<V: Clone> LookupCache<V> {
    pub fn new(name: &'static str, capacity: usize, ttl_secs: u64, clock: SharedClock) -> Self {
        let ttl = Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64);
        Self {
            name,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
            ttl,
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn is_fresh(&self, entry: &Entry<V>, now: DateTime<Utc>) -> bool {
        now - entry.inserted_at < self.ttl
    }

    /// Fresh value for `key`, if any. An expired entry is dropped on the way.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let entry = inner.entries.get(key)?;
        if self.is_fresh(entry, now) {
            return Some(entry.value.clone());
        }
        inner.entries.remove(key);
        inner.order.retain(|k| k != key);
        gauge!("lookup_cache_size", "cache" => self.name).set(inner.entries.len() as f64);
        None
    }

    /// Insert or replace `key`, evicting the oldest insertions beyond capacity.
    pub fn insert(&self, key: String, value: V) {
        let now = self.clock.now();
        let mut inner = self.lock();

        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );

        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            counter!("lookup_cache_evictions_total", "cache" => self.name).increment(1);
            debug!(cache = self.name, "evicted oldest entry");
        }

        gauge!("lookup_cache_size", "cache" => self.name).set(inner.entries.len() as f64);
    }

    /// Return the cached value for `key`, or run `fetch` and store its `Ok`
    /// result. Errors are passed through and never cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<Cached<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            counter!("lookup_cache_hits_total", "cache" => self.name).increment(1);
            return Ok(Cached {
                value,
                cached: true,
            });
        }
        counter!("lookup_cache_misses_total", "cache" => self.name).increment(1);

        let value = fetch().await?;
        self.insert(key.to_string(), value.clone());
        Ok(Cached {
            value,
            cached: false,
        })
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry unconditionally. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let n = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        gauge!("lookup_cache_size", "cache" => self.name).set(0.0);
        n
    }

    pub fn stats(&self) -> CacheStats {
        let ttl_seconds = self.ttl.num_seconds().max(0) as u64;
        CacheStats {
            size: self.len(),
            capacity: self.capacity,
            ttl_seconds,
            ttl_hours: ttl_seconds / 3600,
        }
    }
}
