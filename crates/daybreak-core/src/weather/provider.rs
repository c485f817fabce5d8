//! The forecast facade callers actually talk to.
//!
//! `today_forecast` never returns an error: every failure mode maps to a
//! short user-facing string, and only genuine forecasts are cached. "Today"
//! is always the local date in the provider's fixed timezone, taken from the
//! injected clock.

use chrono_tz::Tz;
use tracing::{debug, info, warn};

use daybreak_types::error::FetchError;
use daybreak_types::weather::ForecastSample;

use crate::clock::Clock;

use super::cache::{ForecastCache, ForecastStore};
use super::format;

/// Shown when a user has no city configured.
pub const NO_CITY_TEXT: &str =
    "🌆 No city set. Pick one in your settings to get the weather forecast.";

// ---------------------------------------------------------------------------
// Upstream fetcher trait
// ---------------------------------------------------------------------------

/// Upstream source of raw forecast samples.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition). The production
/// implementation lives in `daybreak-infra`; tests use scripted fakes.
pub trait ForecastFetcher: Send + Sync {
    /// Fetch the multi-day forecast for `city` (as the user typed it).
    fn fetch_raw(
        &self,
        city: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ForecastSample>, FetchError>> + Send;
}

// ---------------------------------------------------------------------------
// WeatherProvider
// ---------------------------------------------------------------------------

/// Cache-backed forecast provider for a single timezone.
#[derive(Debug)]
pub struct WeatherProvider<C: Clock, F: ForecastFetcher, S: ForecastStore> {
    zone: Tz,
    clock: C,
    fetcher: F,
    cache: ForecastCache<S>,
}

impl<C: Clock, F: ForecastFetcher, S: ForecastStore> WeatherProvider<C, F, S> {
    pub fn new(zone: Tz, clock: C, fetcher: F, store: S) -> Self {
        Self {
            zone,
            clock,
            fetcher,
            cache: ForecastCache::new(store),
        }
    }

    /// One-line forecast for today in `city`.
    ///
    /// Cache key is the trimmed, lowercased city; the upstream query keeps
    /// the user's spelling. At most one successful upstream call per city per
    /// day; failures and empty responses are reported but never cached, so
    /// the next call retries.
    pub async fn today_forecast(&self, city: &str) -> String {
        let city = city.trim();
        if city.is_empty() {
            return NO_CITY_TEXT.to_string();
        }
        let key = city.to_lowercase();
        let today = self.clock.now_utc().with_timezone(&self.zone).date_naive();

        self.cache.evict_expired(today).await;
        if let Some(text) = self.cache.get(&key, today).await {
            debug!(city = %key, "forecast served from cache");
            return text;
        }

        let samples = match self.fetcher.fetch_raw(city).await {
            Ok(samples) => samples,
            Err(err) => {
                warn!(city = %key, error = %err, "forecast fetch failed");
                return fetch_failure_text(city, &err);
            }
        };
        if samples.is_empty() {
            warn!(city = %key, "forecast response carried no samples");
            return format!("🤷 No forecast data for {city} right now.");
        }

        let Some(summary) = format::summarize(&samples, today, self.zone) else {
            warn!(city = %key, %today, "no forecast samples for today");
            return format!("🔭 Couldn't find today's forecast for {city}.");
        };

        let text = format::format_summary(&summary);
        self.cache.save(&key, &text, today).await;
        info!(city = %key, "forecast fetched and cached");
        text
    }
}

fn fetch_failure_text(city: &str, err: &FetchError) -> String {
    match err {
        FetchError::Status(404) => format!("🏙️ City \"{city}\" not found. Check the spelling."),
        FetchError::Status(_) | FetchError::Timeout => {
            "🌐 The weather service is not responding right now. Try again later.".to_string()
        }
        FetchError::Network(_) | FetchError::Decode(_) => {
            format!("⚠️ Couldn't load the forecast for {city}. Try again later.")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
