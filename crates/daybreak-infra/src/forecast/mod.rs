//! Forecast infrastructure: the OpenWeather HTTP fetcher and the JSON-file
//! durable cache tier.

pub mod file_store;
pub mod openweather;

pub use file_store::JsonForecastStore;
pub use openweather::OpenWeatherFetcher;
