//! Forecast samples and cache entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One raw forecast sample from the upstream provider.
///
/// The fetcher returns samples in the provider's chronological order; the
/// summary reduction relies on that order when picking a description.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    /// Instant the sample refers to.
    pub at: DateTime<Utc>,
    /// Temperature in degrees Celsius.
    pub temp_c: f64,
    /// Human-readable condition, if the provider supplied one.
    pub description: Option<String>,
}

impl ForecastSample {
    pub fn new(at: DateTime<Utc>, temp_c: f64, description: Option<String>) -> Self {
        Self {
            at,
            temp_c,
            description,
        }
    }
}

/// A cached forecast text together with the calendar day it was produced on.
///
/// An entry is valid only on the day it was cached (in the service's fixed
/// zone); it must never be served across a day boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedForecast {
    /// The formatted, user-facing forecast text.
    pub text: String,
    /// Calendar day (fixed zone) the entry was produced on.
    pub cached_on: NaiveDate,
}

impl CachedForecast {
    pub fn new(text: impl Into<String>, cached_on: NaiveDate) -> Self {
        Self {
            text: text.into(),
            cached_on,
        }
    }

    /// True iff the entry was produced on `today`.
    pub fn is_valid_on(&self, today: NaiveDate) -> bool {
        self.cached_on == today
    }
}
