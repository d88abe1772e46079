use crate::providers::cbr::{CbrSettings, DEFAULT_BASE_URL};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_today_ttl_secs() -> u64 {
    60 * 60
}

fn default_archive_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    5 * 60
}

fn default_fallback_days() -> u32 {
    14
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_today_ttl_secs")]
    pub today_ttl_secs: u64,
    #[serde(default = "default_archive_ttl_secs")]
    pub archive_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            today_ttl_secs: default_today_ttl_secs(),
            archive_ttl_secs: default_archive_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_fallback_days")]
    pub fallback_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            provider: ProviderConfig::default(),
            cache: CacheConfig::default(),
            fallback_days: default_fallback_days(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ru", "cbrates", "cbrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn provider_settings(&self) -> CbrSettings {
        CbrSettings {
            timeout: Duration::from_secs(self.provider.timeout_secs),
            today_ttl: Duration::from_secs(self.cache.today_ttl_secs),
            archive_ttl: Duration::from_secs(self.cache.archive_ttl_secs),
            fallback_days: self.fallback_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
provider:
  base_url: "http://example.com/cbr"
  timeout_secs: 5
cache:
  today_ttl_secs: 60
  archive_ttl_secs: 120
  sweep_interval_secs: 30
fallback_days: 7
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.provider.base_url, "http://example.com/cbr");
        assert_eq!(config.fallback_days, 7);
        assert_eq!(config.cache.sweep_interval(), Duration::from_secs(30));

        let settings = config.provider_settings();
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.today_ttl, Duration::from_secs(60));
        assert_eq!(settings.archive_ttl, Duration::from_secs(120));
        assert_eq!(settings.fallback_days, 7);
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig =
            serde_yaml::from_str("provider:\n  timeout_secs: 3\n").expect("Failed to deserialize");
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.provider.timeout_secs, 3);
        assert_eq!(config.cache.today_ttl_secs, 3600);
        assert_eq!(config.cache.archive_ttl_secs, 86400);
        assert_eq!(config.fallback_days, 14);

        let settings = AppConfig::default().provider_settings();
        let expected = CbrSettings::default();
        assert_eq!(settings.timeout, expected.timeout);
        assert_eq!(settings.today_ttl, expected.today_ttl);
        assert_eq!(settings.archive_ttl, expected.archive_ttl);
        assert_eq!(settings.fallback_days, expected.fallback_days);
    }

    #[test]
    fn test_load_from_missing_path() {
        let result = AppConfig::load_from_path("/nonexistent/cbrates/config.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
