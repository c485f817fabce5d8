//! Configuration types for the Daybreak core.
//!
//! `AppConfig` represents the top-level `daybreak.toml`. All fields have
//! defaults matching the production deployment, so an empty file (or no file
//! at all) yields a working configuration except for the weather API key,
//! which has no usable default and is checked where the fetcher is built.
//!
//! Times are kept as `"HH:MM"` strings so the file stays human-editable;
//! they are validated into `chrono` types at orchestrator construction,
//! never later.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration for the Daybreak core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// IANA name of the fixed zone all local-time math runs in.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub weather: WeatherConfig,
}

fn default_timezone() -> String {
    "Asia/Yekaterinburg".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            schedule: ScheduleConfig::default(),
            session: SessionConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse the configured time-zone name.
    pub fn zone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }
}

/// Daily job times, as local times of day in the fixed zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// When the nightly cleanup runs.
    #[serde(default = "default_cleanup_at")]
    pub cleanup_at: String,

    /// When the morning newsletter goes out.
    #[serde(default = "default_newsletter_at")]
    pub newsletter_at: String,

    /// Reminder leads, in minutes before `cleanup_at`. Fire times are derived
    /// from the cleanup time so they follow it when it changes.
    #[serde(default = "default_reminder_leads")]
    pub reminder_lead_minutes: Vec<u32>,
}

fn default_cleanup_at() -> String {
    "23:59".to_string()
}

fn default_newsletter_at() -> String {
    "07:00".to_string()
}

fn default_reminder_leads() -> Vec<u32> {
    vec![60, 5]
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cleanup_at: default_cleanup_at(),
            newsletter_at: default_newsletter_at(),
            reminder_lead_minutes: default_reminder_leads(),
        }
    }
}

impl ScheduleConfig {
    /// Parsed nightly-cleanup time.
    pub fn cleanup_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_hhmm("cleanup_at", &self.cleanup_at)
    }

    /// Parsed newsletter time.
    pub fn newsletter_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_hhmm("newsletter_at", &self.newsletter_at)
    }

    /// Reminder fire times, derived as `cleanup_at - lead` per configured
    /// lead, wrapping across midnight. Returns `(lead_minutes, fire_time)`
    /// pairs in configuration order.
    pub fn reminder_times(&self) -> Result<Vec<(u32, NaiveTime)>, ConfigError> {
        let cleanup = self.cleanup_time()?;
        let mut times = Vec::with_capacity(self.reminder_lead_minutes.len());
        for &lead in &self.reminder_lead_minutes {
            if lead == 0 || lead >= 24 * 60 {
                return Err(ConfigError::InvalidReminderLead(lead));
            }
            let (at, _) = cleanup.overflowing_sub_signed(chrono::Duration::minutes(lead as i64));
            times.push((lead, at));
        }
        Ok(times)
    }
}

fn parse_hhmm(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::InvalidTime {
        field,
        value: value.to_string(),
    })
}

/// Session timeout and sweep cadence.
///
/// The timeout bounds session *validity*; the sweep interval only bounds how
/// soon an expired session is noticed and the user told. A 60s sweep over a
/// 10s timeout is the accepted notification latency, not a bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Upstream forecast provider and durable cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeather API key. Required; there is no default.
    #[serde(default)]
    pub api_key: String,

    /// Forecast endpoint base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Where the durable cache tier lives on disk.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5/forecast".to_string()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/weather_cache.json")
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            cache_path: default_cache_path(),
        }
    }
}
