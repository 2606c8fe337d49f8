//! Application configuration management.
//!
//! Configuration is stored at `~/.config/charitydesk/config.json`. Every
//! field can be overridden from the environment (a `.env` file is honored
//! by the binary):
//!
//! - `CHARITYDESK_DATABASE_URL`
//! - `CHARITYDESK_AUTH_TOKEN`
//! - `CHARITYDESK_DONOR_TTL_MS`
//! - `CHARITYDESK_UTC_OFFSET_MINUTES`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::directory::DEFAULT_DONOR_TTL;

/// Application name used for config/data directory paths
const APP_NAME: &str = "charitydesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

fn default_donor_ttl_ms() -> u64 {
    DEFAULT_DONOR_TTL.as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the realtime database, e.g. `https://my-charity.firebaseio.com`
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_donor_ttl_ms")]
    pub donor_cache_ttl_ms: u64,
    /// Offset used to decide which month a transaction falls in
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            auth_token: None,
            donor_cache_ttl_ms: default_donor_ttl_ms(),
            utc_offset_minutes: 0,
        }
    }
}

impl Config {
    /// Load from the config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from `lookup` (the process environment in practice).
    /// Unparseable numbers are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CHARITYDESK_DATABASE_URL").filter(|s| !s.is_empty()) {
            self.database_url = Some(url);
        }
        if let Some(token) = lookup("CHARITYDESK_AUTH_TOKEN").filter(|s| !s.is_empty()) {
            self.auth_token = Some(token);
        }
        if let Some(raw) = lookup("CHARITYDESK_DONOR_TTL_MS") {
            match raw.trim().parse() {
                Ok(ms) => self.donor_cache_ttl_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid CHARITYDESK_DONOR_TTL_MS"),
            }
        }
        if let Some(raw) = lookup("CHARITYDESK_UTC_OFFSET_MINUTES") {
            match raw.trim().parse() {
                Ok(minutes) => self.utc_offset_minutes = minutes,
                Err(_) => warn!(value = %raw, "Ignoring invalid CHARITYDESK_UTC_OFFSET_MINUTES"),
            }
        }
    }

    pub fn donor_ttl(&self) -> Duration {
        Duration::from_millis(self.donor_cache_ttl_ms)
    }

    /// Timezone for month boundaries. Out-of-range offsets fall back to UTC.
    pub fn timezone(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                warn!(offset = self.utc_offset_minutes, "UTC offset out of range, using UTC");
                Utc.fix()
            })
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for local state such as the current-user file
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.donor_ttl(), Duration::from_millis(300_000));
        assert_eq!(config.timezone().local_minus_utc(), 0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"database_url": "https://demo.example.com"}"#).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("https://demo.example.com"));
        assert_eq!(config.donor_cache_ttl_ms, 300_000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CHARITYDESK_DATABASE_URL", "https://env.example.com"),
            ("CHARITYDESK_DONOR_TTL_MS", "0"),
            ("CHARITYDESK_UTC_OFFSET_MINUTES", "-300"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.database_url.as_deref(), Some("https://env.example.com"));
        assert_eq!(config.donor_ttl(), Duration::ZERO);
        assert_eq!(config.timezone().local_minus_utc(), -5 * 3600);
        assert_eq!(config.auth_token, None);
    }

    #[test]
    fn test_invalid_env_numbers_ignored() {
        let mut config = Config::default();
        config.apply_env(|name| match name {
            "CHARITYDESK_DONOR_TTL_MS" => Some("five minutes".to_string()),
            _ => None,
        });
        assert_eq!(config.donor_cache_ttl_ms, 300_000);
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        let config = Config {
            utc_offset_minutes: 100_000,
            ..Default::default()
        };
        assert_eq!(config.timezone().local_minus_utc(), 0);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charitydesk").join(CONFIG_FILE);
        let config = Config {
            database_url: Some("https://file.example.com".to_string()),
            donor_cache_ttl_ms: 60_000,
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
        assert_eq!(Config::load_from(&dir.path().join("missing.json")).unwrap(), Config::default());
    }
}
