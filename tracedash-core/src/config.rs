use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dashboard::socket_url;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "TRACEDASH_CONFIG";
/// Environment variable overriding the REST API base URL
pub const API_URL_ENV: &str = "TRACEDASH_API_URL";
/// Environment variable overriding the machine id
pub const MACHINE_ID_ENV: &str = "TRACEDASH_MACHINE_ID";

/// User configuration, stored as YAML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the requirements REST API
    pub api_url: String,
    /// Host (and port) serving the telemetry socket
    pub dashboard_host: String,
    /// Use wss:// for the telemetry socket
    pub secure: bool,
    /// Machine whose telemetry is shown
    pub machine_id: String,
    /// Where the last telemetry snapshot is cached
    pub cache_path: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub reconnect_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            dashboard_host: "localhost:8000".to_string(),
            secure: false,
            machine_id: "1".to_string(),
            cache_path: None,
            poll_interval_ms: 1000,
            reconnect_delay_ms: 5000,
        }
    }
}

impl Config {
    /// Loads the config from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Rejects values the dashboard cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }
        if self.reconnect_delay_ms == 0 {
            anyhow::bail!("reconnect_delay_ms must be greater than 0");
        }
        Ok(())
    }

    /// Loads the config if the file exists, otherwise returns defaults.
    /// Environment overrides are applied either way.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Save the config to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            self.api_url = url;
        }
        if let Ok(machine) = std::env::var(MACHINE_ID_ENV) {
            self.machine_id = machine;
        }
    }

    /// Socket endpoint for the configured machine
    pub fn socket_url(&self) -> Result<String> {
        socket_url(&self.dashboard_host, self.secure, &self.machine_id)
    }

    /// Cache file for the last telemetry snapshot
    pub fn snapshot_cache_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.cache_path {
            return Ok(path.clone());
        }
        let cache_dir = dirs::cache_dir().context("Failed to determine cache directory")?;
        Ok(cache_dir.join("tracedash").join("dashboard.json"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    // Check if TRACEDASH_CONFIG environment variable is set
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.tracedash.yaml
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

    Ok(home_dir.join(".tracedash.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "dashboard_host: plant.local:9000\nsecure: true\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.dashboard_host, "plant.local:9000");
        assert!(config.secure);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.socket_url().unwrap(), "wss://plant.local:9000/ws/1");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.yaml");

        let config = Config {
            machine_id: "7".to_string(),
            cache_path: Some(temp_dir.path().join("cache.json")),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.snapshot_cache_path().unwrap(), temp_dir.path().join("cache.json"));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "secure: [not a bool").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_zero_intervals_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");

        fs::write(&path, "poll_interval_ms: 0\n").unwrap();
        let err = Config::load_or_default(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("poll_interval_ms must be greater than 0"));

        fs::write(&path, "reconnect_delay_ms: 0\n").unwrap();
        assert!(Config::load(&path).is_err());

        fs::write(&path, "poll_interval_ms: 250\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().poll_interval(), Duration::from_millis(250));
    }
}
