//! Infrastructure for Daybreak: configuration loading, tracing setup, the
//! OpenWeather fetcher, and the JSON-file forecast store.

pub mod config;
pub mod forecast;
pub mod telemetry;
