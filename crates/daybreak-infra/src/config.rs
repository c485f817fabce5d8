//! Configuration file loading.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use daybreak_types::config::AppConfig;
use daybreak_types::error::ConfigError;

/// Load configuration from a TOML file.
///
/// A missing file is not an error: defaults apply, matching a fresh install.
/// An unreadable or malformed file *is* an error, so a typo in the config
/// never silently runs the service with defaults.
pub async fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();

    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(AppConfig::default());
        }
        Err(err) => return Err(ConfigError::Read(err.to_string())),
    };

    let config: AppConfig =
        toml::from_str(&raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
    debug!(path = %path.display(), "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn test_loads_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daybreak.toml");
        tokio::fs::write(
            &path,
            r#"
timezone = "Europe/Moscow"

[schedule]
cleanup_at = "22:00"
newsletter_at = "08:30"
reminder_lead_minutes = [30]

[session]
timeout_secs = 15
sweep_interval_secs = 120

[weather]
api_key = "secret"
"#,
        )
        .await
        .unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.timezone, "Europe/Moscow");
        assert_eq!(config.schedule.cleanup_at, "22:00");
        assert_eq!(config.schedule.reminder_lead_minutes, vec![30]);
        assert_eq!(config.session.timeout_secs, 15);
        assert_eq!(config.weather.api_key, "secret");
    }

    #[tokio::test]
    async fn test_partial_config_keeps_defaults_for_the_rest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daybreak.toml");
        tokio::fs::write(&path, "[schedule]\ncleanup_at = \"21:00\"\n")
            .await
            .unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.schedule.cleanup_at, "21:00");
        assert_eq!(config.schedule.newsletter_at, "07:00");
        assert_eq!(config.timezone, "Asia/Yekaterinburg");
    }

    #[tokio::test]
    async fn test_malformed_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("daybreak.toml");
        tokio::fs::write(&path, "timezone = [not toml").await.unwrap();

        assert!(matches!(
            load_config(&path).await.unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
