//! Weather forecasts: summary formatting, the two-tier cache, and the
//! provider facade that joins cache and upstream fetcher.

pub mod cache;
pub mod format;
pub mod provider;

pub use cache::{ForecastCache, ForecastStore};
pub use provider::{ForecastFetcher, NO_CITY_TEXT, WeatherProvider};
