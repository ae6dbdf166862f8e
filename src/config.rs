//! User configuration: API endpoint, token and retry policy
//!
//! ```toml
//! base_url = "https://api.example.com/v2"
//! api_token = "..."
//!
//! [retry]
//! max_attempts = 5
//! base_delay_ms = 200
//! max_delay_ms = 30000
//! ```
//!
//! `--api-token` / `CRMFORM_API_TOKEN` and `--base-url` / `CRMFORM_BASE_URL`
//! take precedence over the file.

use anyhow::{Context, Result, bail};
use crmkit::{Client, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Config Schema
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// API base URL; the public endpoint when unset
    pub base_url: Option<String>,

    pub api_token: Option<String>,

    pub retry: RetrySettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per remote call, including the first
    pub max_attempts: u32,

    pub base_delay_ms: u64,

    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_ms: defaults.base_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
        }
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub api_token: Option<String>,
    pub base_url: Option<String>,
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load the config file
    ///
    /// An explicit path must exist. The default path may be missing, in
    /// which case built-in defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = crate::paths::config_file()?;
                if !path.exists() {
                    log::debug!("No config file at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid TOML format")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            bail!(
                "retry.max_delay_ms ({}) is shorter than retry.base_delay_ms ({})",
                self.retry.max_delay_ms,
                self.retry.base_delay_ms
            );
        }
        Ok(())
    }

    /// Apply command-line and environment overrides
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(token) = overrides.api_token.filter(|t| !t.is_empty()) {
            self.api_token = Some(token);
        }
        if let Some(url) = overrides.base_url.filter(|u| !u.is_empty()) {
            self.base_url = Some(url);
        }
        self
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            ..RetryConfig::default()
        }
    }

    /// Build the API client
    pub fn client(&self) -> Result<Client> {
        let Some(token) = self.api_token.as_deref().filter(|t| !t.is_empty()) else {
            bail!(
                "No API token configured. Set CRMFORM_API_TOKEN, pass --api-token, \
                 or add api_token to the config file"
            );
        };

        let client = match &self.base_url {
            Some(url) => {
                log::debug!("Using API base {url}");
                Client::with_api_base(url.trim_end_matches('/'), token)
            }
            None => Client::new(token),
        };
        Ok(client.with_retry(self.retry_config()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.api_token, None);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry_config(), RetryConfig::default());
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
base_url = "http://localhost:8080/v2"
api_token = "secret"

[retry]
max_attempts = 3
base_delay_ms = 50
max_delay_ms = 1000
"#,
        )
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v2"));
        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.base_delay, Duration::from_millis(50));
        assert_eq!(retry.max_delay, Duration::from_secs(1));
        assert!((retry.backoff_factor - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_retry_rejected() {
        assert!(Config::parse("[retry]\nmax_attempts = 0").is_err());
        assert!(Config::parse("[retry]\nbase_delay_ms = 500\nmax_delay_ms = 100").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::parse("api_token = \"from-file\"")
            .unwrap()
            .with_overrides(Overrides {
                api_token: Some("from-flag".into()),
                base_url: Some(String::new()),
            });

        assert_eq!(config.api_token.as_deref(), Some("from-flag"));
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn test_client_requires_token() {
        let err = Config::default().client().unwrap_err();
        assert!(err.to_string().contains("No API token"));

        let config = Config {
            api_token: Some("t".into()),
            ..Config::default()
        };
        let client = config.client().unwrap();
        assert_eq!(client.retry_config().max_attempts, 5);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_token = \"abc\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.api_token.as_deref(), Some("abc"));

        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
