//! Application-level configuration loading: trigger secret, season calendar and job limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use time::Weekday;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LEAGUE_ENGINE_CONFIG_PATH";
/// Environment variable that overrides the trigger secret from the file.
const TRIGGER_SECRET_ENV: &str = "LEAGUE_ENGINE_TRIGGER_SECRET";

const DEFAULT_CLAIM_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_TIER_LEAGUE_CAPACITY: u32 = 30;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    trigger_secret: Option<String>,
    season_boundary: Weekday,
    claim_timeout: Duration,
    job_timeout: Duration,
    tier_league_capacity: u32,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        boundary = %config.season_boundary,
                        "loaded league engine config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        match env::var(TRIGGER_SECRET_ENV) {
            Ok(secret) if !secret.is_empty() => config.with_trigger_secret(secret),
            _ => config,
        }
    }

    /// Parse a JSON configuration document.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let raw = serde_json::from_str::<RawConfig>(contents).map_err(ConfigError::Parse)?;
        raw.try_into()
    }

    /// Replace the shared secret expected from scheduled triggers.
    pub fn with_trigger_secret(mut self, secret: impl Into<String>) -> Self {
        self.trigger_secret = Some(secret.into());
        self
    }

    /// Replace the weekday new seasons start on.
    pub fn with_season_boundary(mut self, boundary: Weekday) -> Self {
        self.season_boundary = boundary;
        self
    }

    /// Replace the age after which a `closing` claim may be taken over.
    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }

    /// Shared secret expected in the `Authorization: Bearer` header of triggers.
    pub fn trigger_secret(&self) -> Option<&str> {
        self.trigger_secret.as_deref()
    }

    /// Weekday on which seasons start.
    pub fn season_boundary(&self) -> Weekday {
        self.season_boundary
    }

    /// Age after which a crashed closure run's claim is considered abandoned.
    pub fn claim_timeout(&self) -> Duration {
        self.claim_timeout
    }

    /// Upper bound on a single scheduled job.
    pub fn job_timeout(&self) -> Duration {
        self.job_timeout
    }

    /// Capacity given to tier leagues created at bootstrap.
    pub fn tier_league_capacity(&self) -> u32 {
        self.tier_league_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            trigger_secret: None,
            season_boundary: Weekday::Monday,
            claim_timeout: DEFAULT_CLAIM_TIMEOUT,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            tier_league_capacity: DEFAULT_TIER_LEAGUE_CAPACITY,
        }
    }
}

/// Reasons a configuration document is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON for [`RawConfig`].
    #[error("invalid config document")]
    Parse(#[source] serde_json::Error),
    /// The season boundary does not name a weekday.
    #[error("unknown weekday `{0}`")]
    UnknownWeekday(String),
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    trigger_secret: Option<String>,
    season_boundary: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    claim_timeout_secs: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    job_timeout_secs: Duration,
    tier_league_capacity: u32,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            trigger_secret: None,
            season_boundary: "monday".into(),
            claim_timeout_secs: DEFAULT_CLAIM_TIMEOUT,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT,
            tier_league_capacity: DEFAULT_TIER_LEAGUE_CAPACITY,
        }
    }
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            trigger_secret: value.trigger_secret.filter(|secret| !secret.is_empty()),
            season_boundary: parse_weekday(&value.season_boundary)?,
            claim_timeout: value.claim_timeout_secs,
            job_timeout: value.job_timeout_secs,
            tier_league_capacity: value.tier_league_capacity,
        })
    }
}

fn parse_weekday(value: &str) -> Result<Weekday, ConfigError> {
    let weekday = match value.to_ascii_lowercase().as_str() {
        "monday" => Weekday::Monday,
        "tuesday" => Weekday::Tuesday,
        "wednesday" => Weekday::Wednesday,
        "thursday" => Weekday::Thursday,
        "friday" => Weekday::Friday,
        "saturday" => Weekday::Saturday,
        "sunday" => Weekday::Sunday,
        _ => return Err(ConfigError::UnknownWeekday(value.to_owned())),
    };
    Ok(weekday)
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.season_boundary(), Weekday::Monday);
        assert_eq!(config.claim_timeout(), DEFAULT_CLAIM_TIMEOUT);
        assert_eq!(config.trigger_secret(), None);
    }

    #[test]
    fn full_document_is_parsed() {
        let config = AppConfig::from_json(
            r#"{
                "trigger_secret": "s3cret",
                "season_boundary": "Sunday",
                "claim_timeout_secs": 30,
                "job_timeout_secs": 5,
                "tier_league_capacity": 50
            }"#,
        )
        .unwrap();
        assert_eq!(config.trigger_secret(), Some("s3cret"));
        assert_eq!(config.season_boundary(), Weekday::Sunday);
        assert_eq!(config.claim_timeout(), Duration::from_secs(30));
        assert_eq!(config.job_timeout(), Duration::from_secs(5));
        assert_eq!(config.tier_league_capacity(), 50);
    }

    #[test]
    fn unknown_weekday_is_rejected() {
        let err = AppConfig::from_json(r#"{"season_boundary": "someday"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownWeekday(day) if day == "someday"));
    }

    #[test]
    fn empty_secret_counts_as_unset() {
        let config = AppConfig::from_json(r#"{"trigger_secret": ""}"#).unwrap();
        assert_eq!(config.trigger_secret(), None);
    }
}
