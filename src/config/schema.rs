//! Configuration schema for debhub
//!
//! Configuration is stored at `~/.config/debhub/config.toml`

use crate::package::RETRY_DELAY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Download settings
    pub fetch: FetchConfig,

    /// Package cache settings
    pub cache: CacheConfig,

    /// Index output settings
    pub index: IndexConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Overall timeout for one download
    pub timeout_secs: u64,

    /// Largest package accepted, in MB
    pub max_download_mb: u64,

    /// User-Agent header sent with downloads
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_download_mb: 512,
            user_agent: concat!("debhub/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Package cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds before a package that failed to download is fetched again
    pub retry_delay_secs: u64,
}

impl CacheConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retry_delay_secs: RETRY_DELAY.as_secs(),
        }
    }
}

/// Index output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Include the repository name in `Filename` paths
    pub organization_wide: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[fetch]"));
        assert!(toml.contains("retry_delay_secs = 30"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.retry_delay(), Duration::from_secs(30));
        assert!(!config.index.organization_wide);
        assert!(config.fetch.user_agent.starts_with("debhub/"));
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [index]
            organization_wide = true
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.index.organization_wide);
        assert_eq!(config.fetch.timeout_secs, 60); // default preserved
    }
}
