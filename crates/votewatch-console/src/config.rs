//! Monitor configuration: defaults, TOML file, environment, CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use votewatch_protocol::{DEFAULT_POLL_ID, DEFAULT_REFRESH_INTERVAL};

use crate::ConfigError;

pub const ENV_ORIGIN: &str = "VOTEWATCH_ORIGIN";
pub const ENV_POLL_ID: &str = "VOTEWATCH_POLL_ID";
pub const ENV_REFRESH_MS: &str = "VOTEWATCH_REFRESH_MS";
pub const ENV_LOG: &str = "VOTEWATCH_LOG";

/// Top-level monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Origin of the node to watch; every request stays on it.
    pub origin: String,
    /// Poll shown at startup.
    pub poll_id: String,
    /// Period of the automatic refresh.
    pub refresh_interval_ms: u64,
    /// Per-request timeout. Unset means requests only fail when the
    /// transport does.
    pub request_timeout_ms: Option<u64>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `votewatch_console=debug`.
    pub level: String,
    /// Log file used while the console owns the terminal.
    pub file: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8000".to_string(),
            poll_id: DEFAULT_POLL_ID.to_string(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL.as_millis() as u64,
            request_timeout_ms: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None` and a file exists there. Falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                let config = Self::from_toml_str(&text, &path.display().to_string())?;
                tracing::debug!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(text: &str, label: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: label.to_string(),
            source,
        })
    }

    /// Apply `VOTEWATCH_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(origin) = lookup(ENV_ORIGIN) {
            self.origin = origin;
        }
        if let Some(poll_id) = lookup(ENV_POLL_ID) {
            self.poll_id = poll_id;
        }
        if let Some(ms) = lookup(ENV_REFRESH_MS) {
            self.refresh_interval_ms = ms.trim().parse().map_err(|e| ConfigError::Invalid {
                key: ENV_REFRESH_MS,
                reason: format!("'{ms}': {e}"),
            })?;
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.origin).map_err(|e| ConfigError::Invalid {
            key: "origin",
            reason: format!("'{}': {e}", self.origin),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "origin",
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "refresh_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                key: "request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// `<config dir>/votewatch/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("votewatch").join("config.toml"))
    }

    /// Configured log file, or `<data dir>/votewatch/votewatch.log`.
    pub fn log_file(&self) -> PathBuf {
        self.logging.file.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("votewatch")
                .join("votewatch.log")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_protocol() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_id, "poll1");
        assert_eq!(config.refresh_interval(), Duration::from_secs(2));
        assert_eq!(config.request_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = MonitorConfig::from_toml_str(
            r#"
            origin = "http://node2:8002"

            [logging]
            level = "debug"
            "#,
            "inline",
        )
        .unwrap();
        assert_eq!(config.origin, "http://node2:8002");
        assert_eq!(config.poll_id, "poll1");
        assert_eq!(config.refresh_interval_ms, 2000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_ORIGIN, "http://10.0.0.5:8000"),
            (ENV_REFRESH_MS, "500"),
        ]
        .into_iter()
        .collect();

        let mut config = MonitorConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.origin, "http://10.0.0.5:8000");
        assert_eq!(config.refresh_interval_ms, 500);
        assert_eq!(config.poll_id, "poll1");
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = MonitorConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_REFRESH_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_REFRESH_MS));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = MonitorConfig {
            origin: "ftp://node1".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.origin = "http://node1:8001".to_string();
        config.refresh_interval_ms = 0;
        assert!(config.validate().is_err());

        config.refresh_interval_ms = 2000;
        config.request_timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_log_file_wins() {
        let config = MonitorConfig {
            logging: LoggingConfig {
                level: "info".into(),
                file: Some(PathBuf::from("/tmp/vw.log")),
            },
            ..Default::default()
        };
        assert_eq!(config.log_file(), PathBuf::from("/tmp/vw.log"));
    }
}
