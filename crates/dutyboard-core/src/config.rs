//! DutyBoard configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DutyBoardError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DutyBoardConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl DutyBoardConfig {
    /// Load config from the default path (~/.dutyboard/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DutyBoardError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DutyBoardError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.window.days == 0 {
            return Err(DutyBoardError::Config("window.days must be at least 1".into()));
        }
        if self.sync.poll_interval_secs == 0 || self.window.reanchor_interval_secs == 0 {
            return Err(DutyBoardError::Config("intervals must be non-zero".into()));
        }
        if !(self.reconnect.multiplier >= 1.0 && self.reconnect.multiplier.is_finite()) {
            return Err(DutyBoardError::Config("reconnect.multiplier must be >= 1.0".into()));
        }
        if self.reconnect.floor_ms == 0 || self.reconnect.ceiling_ms < self.reconnect.floor_ms {
            return Err(DutyBoardError::Config(
                "reconnect.floor_ms must be > 0 and <= ceiling_ms".into(),
            ));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dutyboard")
            .join("config.toml")
    }
}

/// Where the schedule server lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_events_path")]
    pub events_path: String,
    #[serde(default = "default_day_path")]
    pub day_path: String,
    #[serde(default = "default_window_path")]
    pub window_path: String,
    #[serde(default = "default_closures_path")]
    pub closures_path: String,
}

fn default_base_url() -> String { "http://127.0.0.1:5000".into() }
fn default_events_path() -> String { "/events".into() }
fn default_day_path() -> String { "/api/day".into() }
fn default_window_path() -> String { "/api/window".into() }
fn default_closures_path() -> String { "/api/closures".into() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            events_path: default_events_path(),
            day_path: default_day_path(),
            window_path: default_window_path(),
            closures_path: default_closures_path(),
        }
    }
}

impl ServerConfig {
    /// Join the base URL with an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Date window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_days")]
    pub days: usize,
    #[serde(default = "default_reanchor_interval")]
    pub reanchor_interval_secs: u64,
    /// Hospital local time offset from UTC, used to decide what "today" is.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

fn default_days() -> usize { 14 }
fn default_reanchor_interval() -> u64 { 300 }
fn default_utc_offset() -> i32 { 5 * 60 }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            reanchor_interval_secs: default_reanchor_interval(),
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

impl WindowConfig {
    pub fn reanchor_interval(&self) -> Duration {
        Duration::from_secs(self.reanchor_interval_secs)
    }
}

/// Safety-net polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 { 8 }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Push-channel reconnect backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_floor_ms")]
    pub floor_ms: u64,
    #[serde(default = "default_ceiling_ms")]
    pub ceiling_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Fraction of the next backoff step added as random jitter (0 disables).
    #[serde(default)]
    pub jitter: f64,
}

fn default_floor_ms() -> u64 { 1000 }
fn default_ceiling_ms() -> u64 { 30_000 }
fn default_multiplier() -> f64 { 1.7 }

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            floor_ms: default_floor_ms(),
            ceiling_ms: default_ceiling_ms(),
            multiplier: default_multiplier(),
            jitter: 0.0,
        }
    }
}

/// Display-layer options. These never change classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Reveal cards whose status is listed in `hidden_statuses`.
    #[serde(default)]
    pub show_hidden: bool,
    #[serde(default)]
    pub hidden_statuses: Vec<String>,
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,
}

fn default_highlight_ms() -> u64 { 2600 }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_hidden: false,
            hidden_statuses: Vec::new(),
            highlight_ms: default_highlight_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DutyBoardConfig::default();
        assert_eq!(config.window.days, 14);
        assert_eq!(config.sync.poll_interval_secs, 8);
        assert_eq!(config.window.reanchor_interval_secs, 300);
        assert_eq!(config.reconnect.floor_ms, 1000);
        assert_eq!(config.reconnect.ceiling_ms, 30_000);
        assert!((config.reconnect.multiplier - 1.7).abs() < f64::EPSILON);
        assert_eq!(config.display.highlight_ms, 2600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [server]
            base_url = "http://board.local:8080/"

            [window]
            days = 7

            [display]
            show_hidden = true
            hidden_statuses = ["LEAVE", "SICK"]
        "#;

        let config: DutyBoardConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.window.days, 7);
        assert_eq!(config.window.utc_offset_minutes, 300);
        assert!(config.display.show_hidden);
        assert_eq!(config.display.hidden_statuses.len(), 2);
        assert_eq!(config.server.url("/api/day"), "http://board.local:8080/api/day");
    }

    #[test]
    fn test_validate_rejects_bad_backoff() {
        let mut config = DutyBoardConfig::default();
        config.reconnect.multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = DutyBoardConfig::default();
        config.reconnect.ceiling_ms = 10;
        assert!(config.validate().is_err());
    }
}
