//! JSON-file durable tier for the forecast cache.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use daybreak_core::weather::ForecastStore;
use daybreak_types::error::StoreError;
use daybreak_types::weather::CachedForecast;

/// Forecast cache entries persisted as one pretty-printed JSON file.
///
/// The whole map lives in memory behind a mutex and the file is rewritten
/// after every mutation. Entry counts are one per city, so a full rewrite is
/// cheaper than it sounds and keeps the on-disk state readable.
#[derive(Debug)]
pub struct JsonForecastStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, CachedForecast>>,
}

impl JsonForecastStore {
    /// Open the store at `path`, creating parent directories and hydrating
    /// from an existing file.
    ///
    /// A missing file starts empty. A corrupt file is logged and also starts
    /// empty: stale forecasts are cheap to refetch, blocking startup over
    /// them is not worth it.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| StoreError::Io(err.to_string()))?;
        }

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "corrupt forecast cache file; starting empty"
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(StoreError::Io(err.to_string())),
        };

        debug!(path = %path.display(), entries = entries.len(), "forecast cache file opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &HashMap<String, CachedForecast>) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|err| StoreError::Serde(err.to_string()))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|err| StoreError::Io(err.to_string()))
    }
}

impl ForecastStore for JsonForecastStore {
    async fn get(&self, key: &str) -> Result<Option<CachedForecast>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn save(&self, key: &str, entry: &CachedForecast) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), entry.clone());
        self.persist(&entries).await
    }

    async fn remove_expired(&self, today: NaiveDate) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid_on(today));
        if entries.len() == before {
            // Nothing changed; skip the disk write.
            return Ok(());
        }
        self.persist(&entries).await
    }
}
