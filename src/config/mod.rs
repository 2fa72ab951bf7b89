use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::AnalysisType;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Transcript retrieval settings
    pub fetch: FetchConfig,

    /// Worker pool settings
    pub batch: BatchConfig,

    /// Result cache settings
    pub cache: CacheConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Path or name of the yt-dlp executable
    pub yt_dlp_path: String,

    /// Preferred caption languages, most preferred first
    pub languages: Vec<String>,

    /// Timeout for a single fetch attempt in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum concurrent transcript fetches
    pub max_workers: usize,

    /// Extra attempts for rate-limited or unknown failures
    pub max_retries: u32,

    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached results
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Analysis type used when none is given on the command line
    pub default_analysis: AnalysisType,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            languages: vec![
                "zh-TW".to_string(),
                "zh-CN".to_string(),
                "zh".to_string(),
                "en".to_string(),
            ],
            timeout_secs: 60,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: crate::cache::DEFAULT_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            if let Err(e) = config.save().await {
                tracing::warn!(error = ?e, "Could not write default config file");
            }
            Ok(config)
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("yt-text-analyzer").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.batch.max_workers == 0 {
            anyhow::bail!("batch.max_workers must be at least 1");
        }

        if self.cache.capacity == 0 {
            anyhow::bail!("cache.capacity must be at least 1");
        }

        if self.fetch.languages.is_empty() {
            anyhow::bail!("fetch.languages must list at least one language");
        }

        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be at least 1");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.fetch.yt_dlp_path);
        println!("  Languages: {}", self.fetch.languages.join(", "));
        println!("  Fetch timeout: {}s", self.fetch.timeout_secs);
        println!("  Max workers: {}", self.batch.max_workers);
        println!("  Max retries: {}", self.batch.max_retries);
        println!("  Retry delay: {}ms", self.batch.retry_delay_ms);
        println!("  Cache capacity: {}", self.cache.capacity);
        println!("  Default analysis: {}", self.app.default_analysis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.batch.max_workers, 4);
        assert_eq!(config.batch.max_retries, 2);
        assert_eq!(config.cache.capacity, 50);
        assert_eq!(config.app.default_analysis, AnalysisType::Summary);
    }

    #[test]
    fn test_custom_values() {
        let yaml = r#"
fetch:
  yt_dlp_path: /usr/local/bin/yt-dlp
  languages: [en]
  timeout_secs: 30
batch:
  max_workers: 8
  max_retries: 1
  retry_delay_ms: 0
cache:
  capacity: 10
app:
  default_analysis: fact_check
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.fetch.languages, vec!["en".to_string()]);
        assert_eq!(config.batch.max_workers, 8);
        assert_eq!(config.app.default_analysis, AnalysisType::FactCheck);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_yaml("batch:\n  max_workers: 2\n").unwrap();
        assert_eq!(config.batch.max_workers, 2);
        assert_eq!(config.batch.max_retries, 2);
        assert_eq!(config.fetch.yt_dlp_path, "yt-dlp");
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let mut config = Config::default();
        config.batch.max_workers = 0;
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_languages() {
        let mut config = Config::default();
        config.fetch.languages.clear();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(Config::from_yaml(&yaml).is_err());
    }
}
