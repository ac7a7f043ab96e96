//! Pipeline configuration
//!
//! Process-wide constants and the tunable settings for a pipeline
//! instance. The batching constants are deliberately plain consts with no
//! runtime mutation path; everything else loads from YAML or falls back to
//! defaults.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on parallel fetch batches. Not configurable.
pub const MAX_NUM_BATCHES: u32 = 5;

/// Records requested per page unless the config overrides it
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default capacity of the unordered merge's fan-in channel
pub const DEFAULT_MERGE_CAPACITY: usize = 64;

static DEFAULT_CONFIG: Lazy<PipelineConfig> = Lazy::new(PipelineConfig::default);

/// The process-wide default configuration
pub fn default_config() -> &'static PipelineConfig {
    &DEFAULT_CONFIG
}

// ============================================================================
// Pipeline Config
// ============================================================================

/// Settings for one pipeline instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Records requested per page
    pub page_size: u32,
    /// Bounded capacity of the unordered merge channel
    pub merge_capacity: usize,
    /// HTTP transport settings
    pub http: HttpSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            merge_capacity: DEFAULT_MERGE_CAPACITY,
            http: HttpSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_config("page_size", "must be greater than 0"));
        }
        if self.merge_capacity == 0 {
            return Err(Error::invalid_config(
                "merge_capacity",
                "must be greater than 0",
            ));
        }
        if self.http.max_retries > 10 {
            return Err(Error::invalid_config("http.max_retries", "must be <= 10"));
        }
        Ok(())
    }
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// Serializable subset of the HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries per request
    pub max_retries: u32,
    /// Requests per second allowed by the rate limiter (0 disables it)
    pub requests_per_second: u32,
    /// Burst size for the rate limiter
    pub burst_size: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            requests_per_second: 10,
            burst_size: 10,
        }
    }
}

impl HttpSettings {
    /// Build an [`HttpClientConfig`] from these settings
    pub fn to_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .max_retries(self.max_retries);

        builder = if self.requests_per_second == 0 {
            builder.no_rate_limit()
        } else {
            builder.rate_limit(RateLimiterConfig::new(
                self.requests_per_second,
                self.burst_size,
            ))
        };

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.merge_capacity, DEFAULT_MERGE_CAPACITY);
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_global_default_config() {
        assert_eq!(default_config().page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_from_yaml_str() {
        let yaml = r"
page_size: 50
merge_capacity: 8
http:
  timeout_secs: 5
  max_retries: 1
  requests_per_second: 100
  burst_size: 20
";
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.merge_capacity, 8);
        assert_eq!(config.http.timeout_secs, 5);
        assert_eq!(config.http.requests_per_second, 100);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = PipelineConfig::from_yaml_str("page_size: 25").unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.merge_capacity, DEFAULT_MERGE_CAPACITY);
    }

    #[test]
    fn test_invalid_page_size_rejected() {
        let err = PipelineConfig::from_yaml_str("page_size: 0").unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(PipelineConfig::from_yaml_str("page_sise: 10").is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "page_size: 10").unwrap();

        let config = PipelineConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_http_settings_to_client_config() {
        let settings = HttpSettings {
            timeout_secs: 5,
            max_retries: 2,
            requests_per_second: 0,
            burst_size: 0,
        };
        let config = settings.to_client_config();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 2);
        assert!(config.rate_limit.is_none());
    }
}
