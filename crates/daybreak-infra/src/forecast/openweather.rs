//! OpenWeatherFetcher -- concrete [`ForecastFetcher`] over the OpenWeather
//! 5-day forecast API.
//!
//! One GET per call: `{base_url}?q={city}&appid={key}&units=metric&lang=en`.
//! The response's `list` items map to [`ForecastSample`]s; items with a
//! missing timestamp, a missing temperature block, or a non-finite
//! temperature are dropped rather than failing the batch.

use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;

use daybreak_core::weather::ForecastFetcher;
use daybreak_types::config::WeatherConfig;
use daybreak_types::error::{ConfigError, FetchError};
use daybreak_types::weather::ForecastSample;

/// OpenWeather HTTP client.
#[derive(Debug, Clone)]
pub struct OpenWeatherFetcher {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherFetcher {
    /// Upstream calls are capped well under the schedule granularity.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a fetcher from the weather section of the config.
    ///
    /// Fails fast when no API key is configured; a fetcher that can only
    /// ever return 401s is a deployment mistake worth catching at startup.
    pub fn new(config: &WeatherConfig) -> Result<Self, ConfigError> {
        let api_key = config.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .expect("failed to create reqwest client");

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
        })
    }
}

impl ForecastFetcher for OpenWeatherFetcher {
    async fn fetch_raw(&self, city: &str) -> Result<Vec<ForecastSample>, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "en"),
            ])
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))?;

        Ok(body.list.into_iter().filter_map(sample_from_item).collect())
    }
}

fn sample_from_item(item: ForecastItem) -> Option<ForecastSample> {
    let main = item.main?;
    if item.dt <= 0 || !main.temp.is_finite() {
        return None;
    }
    let at = DateTime::from_timestamp(item.dt, 0)?;
    let description = item
        .weather
        .into_iter()
        .next()
        .map(|condition| condition.description)
        .filter(|description| !description.trim().is_empty());
    Some(ForecastSample::new(at, main.temp, description))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    #[serde(default)]
    dt: i64,
    main: Option<MainReading>,
    #[serde(default)]
    weather: Vec<ConditionReading>,
}

#[derive(Debug, Deserialize)]
struct MainReading {
    #[serde(default = "missing_temp")]
    temp: f64,
}

// NaN trips the finite check in `sample_from_item`.
fn missing_temp() -> f64 {
    f64::NAN
}

#[derive(Debug, Deserialize)]
struct ConditionReading {
    description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_rejected() {
        let config = WeatherConfig {
            api_key: "   ".to_string(),
            ..WeatherConfig::default()
        };
        assert!(matches!(
            OpenWeatherFetcher::new(&config).unwrap_err(),
            ConfigError::MissingApiKey
        ));
    }

    #[test]
    fn test_parses_forecast_payload() {
        let raw = r#"{
            "list": [
                {
                    "dt": 1717221600,
                    "main": { "temp": 5.2 },
                    "weather": [ { "description": "light rain" } ]
                },
                {
                    "dt": 0,
                    "main": { "temp": 3.0 },
                    "weather": [ { "description": "ignored, bad dt" } ]
                },
                {
                    "dt": 1717243200,
                    "main": { "temp": 3.8 },
                    "weather": []
                }
            ]
        }"#;

        let body: ForecastResponse = serde_json::from_str(raw).unwrap();
        let samples: Vec<ForecastSample> =
            body.list.into_iter().filter_map(sample_from_item).collect();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].temp_c, 5.2);
        assert_eq!(samples[0].description.as_deref(), Some("light rain"));
        assert_eq!(samples[0].at, DateTime::from_timestamp(1_717_221_600, 0).unwrap());
        assert_eq!(samples[1].description, None);
    }

    #[test]
    fn test_skips_non_finite_temperature() {
        let item = ForecastItem {
            dt: 1_717_221_600,
            main: Some(MainReading { temp: f64::NAN }),
            weather: Vec::new(),
        };
        assert!(sample_from_item(item).is_none());
    }

    #[test]
    fn test_items_missing_main_or_temp_are_skipped() {
        let raw = r#"{
            "list": [
                {
                    "dt": 1717221600,
                    "main": { "temp": 5.2 },
                    "weather": [ { "description": "light rain" } ]
                },
                {
                    "dt": 1717232400,
                    "weather": [ { "description": "no main block" } ]
                },
                {
                    "dt": 1717243200,
                    "main": {},
                    "weather": []
                }
            ]
        }"#;

        let body: ForecastResponse = serde_json::from_str(raw).unwrap();
        let samples: Vec<ForecastSample> =
            body.list.into_iter().filter_map(sample_from_item).collect();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].temp_c, 5.2);
        assert_eq!(samples[0].description.as_deref(), Some("light rain"));
    }

    #[test]
    fn test_blank_description_becomes_none() {
        let item = ForecastItem {
            dt: 1_717_221_600,
            main: Some(MainReading { temp: 1.0 }),
            weather: vec![ConditionReading {
                description: "   ".to_string(),
            }],
        };
        let sample = sample_from_item(item).unwrap();
        assert_eq!(sample.description, None);
    }

    #[test]
    fn test_empty_payload_is_fine() {
        let body: ForecastResponse = serde_json::from_str("{}").unwrap();
        assert!(body.list.is_empty());
    }
}
