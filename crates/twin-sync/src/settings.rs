//! Client settings loading.
//!
//! All viewer settings are loaded from a TOML file. Every section is
//! optional and falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use twin_events::EpisodeConfig;

use crate::error::ConfigError;

/// Complete client settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Where the simulation server lives
    #[serde(default)]
    pub server: ServerSettings,
    /// Control loop pacing
    #[serde(default)]
    pub control: ControlSettings,
    /// Episode parameters sent on reset
    #[serde(default)]
    pub episode: EpisodeConfig,
}

impl Settings {
    /// Loads settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses settings from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Returns the settings as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server.timeout_secs.is_finite() && self.server.timeout_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "server.timeout_secs must be a positive finite number".into(),
            ));
        }
        if !(self.control.speed_mult > 0.0) {
            return Err(ConfigError::Invalid(
                "control.speed_mult must be positive".into(),
            ));
        }
        self.episode.validate()?;
        Ok(())
    }
}

/// Simulation server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Base URL of the simulation API
    pub base_url: String,
    /// Per-request timeout enforced by the HTTP client
    pub timeout_secs: f64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            timeout_secs: 10.0,
        }
    }
}

/// Control loop pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Pause between consecutive steps
    pub step_delay_ms: u64,
    /// Minimum wall-clock gap between summary fetches
    pub summary_interval_ms: u64,
    /// Speed multiplier sent with every step
    pub speed_mult: f64,
    /// Interval of the passive state poller
    pub poll_interval_ms: u64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            step_delay_ms: 150,
            summary_interval_ms: 500,
            speed_mult: 1.0,
            poll_interval_ms: 500,
        }
    }
}

impl ControlSettings {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Generates a default settings file content.
pub fn default_settings_toml() -> String {
    r#"# Factory twin viewer settings

[server]
base_url = "http://127.0.0.1:8000"
timeout_secs = 10.0

[control]
step_delay_ms = 150
summary_interval_ms = 500
speed_mult = 1.0
poll_interval_ms = 500

[episode]
n_jobs = 100
n_stations = 3
buffer_caps = [5, 5]
proc_means = [4.0, 5.0, 4.5]
proc_dists = "uniform"
util_alpha = 0.1
fail_rate = 0.01
repair_time = 60.0
workers = 3
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_toml_matches_defaults() {
        let parsed = Settings::from_str(&default_settings_toml()).unwrap();
        let defaults = Settings::default();

        assert_eq!(parsed.server.base_url, defaults.server.base_url);
        assert_eq!(parsed.control.step_delay_ms, 150);
        assert_eq!(parsed.control.summary_interval_ms, 500);
        assert_eq!(parsed.episode, defaults.episode);
    }

    #[test]
    fn test_partial_file() {
        let settings = Settings::from_str(
            r#"
            [episode]
            workers = 5
            seed = 11
            "#,
        )
        .unwrap();
        assert_eq!(settings.episode.workers, 5);
        assert_eq!(settings.episode.seed, Some(11));
        assert_eq!(settings.episode.n_stations, 3);
        assert_eq!(settings.control.step_delay(), Duration::from_millis(150));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            Settings::from_str("[control]\nspeed_mult = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_str("[episode]\nbuffer_caps = [1, 2, 3]"),
            Err(ConfigError::Episode(_))
        ));
        assert!(matches!(
            Settings::from_str("[server]\ntimeout_secs = inf"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_str("[server]\ntimeout_secs = nan"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Settings::from_str("[server\nbase_url ="),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_round_trip_through_file() {
        let mut settings = Settings::default();
        settings.episode.seed = Some(3);
        settings.server.base_url = "http://sim.local:9000".into();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(settings.to_toml().unwrap().as_bytes()).unwrap();

        let loaded = Settings::from_file(file.path()).unwrap();
        assert_eq!(loaded.server.base_url, "http://sim.local:9000");
        assert_eq!(loaded.episode, settings.episode);
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::from_file(Path::new("/nonexistent/twin.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
