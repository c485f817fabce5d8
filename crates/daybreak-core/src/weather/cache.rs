//! Two-tier forecast cache: a process-local memory tier over a durable tier.
//!
//! The memory tier is a `DashMap` keyed by normalized city name; the durable
//! tier is whatever implements [`ForecastStore`] (a JSON file in production).
//! Entries carry the local date they were produced on and are only served on
//! that date. Durable-tier failures degrade the cache, never the caller: a
//! failed read is a miss, a failed write leaves the memory tier serving.

use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::warn;

use daybreak_types::error::StoreError;
use daybreak_types::weather::CachedForecast;

// ---------------------------------------------------------------------------
// Durable tier trait
// ---------------------------------------------------------------------------

/// Durable tier of the forecast cache.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition). The production
/// implementation lives in `daybreak-infra`; tests use in-memory fakes.
pub trait ForecastStore: Send + Sync {
    /// Look up a cached entry by normalized city key.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<CachedForecast>, StoreError>> + Send;

    /// Insert or overwrite the entry for `key`.
    fn save(
        &self,
        key: &str,
        entry: &CachedForecast,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Drop every entry not cached on `today`.
    fn remove_expired(
        &self,
        today: NaiveDate,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// ForecastCache
// ---------------------------------------------------------------------------

/// Memory tier plus durable tier, consulted in that order.
#[derive(Debug)]
pub struct ForecastCache<S: ForecastStore> {
    memory: DashMap<String, CachedForecast>,
    durable: S,
}

impl<S: ForecastStore> ForecastCache<S> {
    pub fn new(durable: S) -> Self {
        Self {
            memory: DashMap::new(),
            durable,
        }
    }

    /// Cached text for `key`, if an entry exists and was cached on `today`.
    ///
    /// A durable hit is promoted into the memory tier so the next lookup is
    /// lock-and-go.
    pub async fn get(&self, key: &str, today: NaiveDate) -> Option<String> {
        if let Some(entry) = self.memory.get(key) {
            if entry.is_valid_on(today) {
                return Some(entry.text.clone());
            }
        }

        match self.durable.get(key).await {
            Ok(Some(entry)) if entry.is_valid_on(today) => {
                self.memory.insert(key.to_string(), entry.clone());
                Some(entry.text)
            }
            Ok(_) => None,
            Err(err) => {
                warn!(key, error = %err, "durable cache read failed; treating as miss");
                None
            }
        }
    }

    /// Write `text` through to both tiers as today's entry for `key`.
    pub async fn save(&self, key: &str, text: &str, today: NaiveDate) {
        let entry = CachedForecast::new(text, today);
        self.memory.insert(key.to_string(), entry.clone());
        if let Err(err) = self.durable.save(key, &entry).await {
            warn!(key, error = %err, "durable cache write failed; memory tier still serves");
        }
    }

    /// Drop entries from both tiers that were not cached on `today`.
    pub async fn evict_expired(&self, today: NaiveDate) {
        self.memory.retain(|_, entry| entry.is_valid_on(today));
        if let Err(err) = self.durable.remove_expired(today).await {
            warn!(error = %err, "durable cache eviction failed");
        }
    }

    /// Entries currently held in the memory tier.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
