//! Configuration management for the Taco Bell MCP Server
//!
//! Handles the upstream base URL, timeouts, and request headers.

use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable overriding the upstream base URL
pub const ENV_BASE_URL: &str = "TACO_BELL_API_BASE_URL";

/// Environment variable overriding the request timeout (seconds)
pub const ENV_TIMEOUT_SECS: &str = "TACO_BELL_TIMEOUT_SECS";

/// Environment variable overriding the user agent
pub const ENV_USER_AGENT: &str = "TACO_BELL_USER_AGENT";

/// Environment variable toggling the `_` cache-busting parameter (true/false)
pub const ENV_CACHE_BUSTER: &str = "TACO_BELL_CACHE_BUSTER";

/// Configuration for the Taco Bell MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Taco Bell web services, without trailing slash
    pub base_url: String,

    /// Timeout applied to every outbound request
    pub timeout: Duration,

    /// User agent sent upstream
    pub user_agent: String,

    /// Whether to append the `_` timestamp parameter to store lookups
    pub cache_buster: bool,
}

impl Config {
    /// Create a new configuration from defaults and environment variables
    pub fn new() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a configuration, reading overrides through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config = config.with_base_url(base_url)?;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidEnvVar {
                var: ENV_TIMEOUT_SECS.to_string(),
                message: format!("expected a whole number of seconds, got '{}'", raw),
            })?;
            config = config.with_timeout(Duration::from_secs(secs))?;
        }

        if let Some(user_agent) = lookup(ENV_USER_AGENT) {
            if !user_agent.trim().is_empty() {
                config.user_agent = user_agent;
            }
        }

        if let Some(raw) = lookup(ENV_CACHE_BUSTER) {
            config.cache_buster = parse_flag(&raw).ok_or_else(|| ConfigError::InvalidEnvVar {
                var: ENV_CACHE_BUSTER.to_string(),
                message: format!("expected true or false, got '{}'", raw),
            })?;
        }

        Ok(config)
    }

    /// Turn the `_` timestamp parameter on store lookups on or off
    pub fn with_cache_buster(mut self, enabled: bool) -> Self {
        self.cache_buster = enabled;
        self
    }

    /// Point the configuration at a different upstream
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');

        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidConfig {
                message: format!("base URL must be http(s), got '{}'", base_url),
            }
            .into());
        }

        self.base_url = trimmed.to_string();
        Ok(self)
    }

    /// Change the outbound request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(ConfigError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }

        self.timeout = timeout;
        Ok(self)
    }

    /// URL of the stores lookup endpoint
    pub fn stores_url(&self) -> String {
        format!("{}/stores", self.base_url)
    }

    /// URL of the menu endpoint for a store
    pub fn menu_url(&self, store_id: &str) -> String {
        format!(
            "{}/products/menu/{}",
            self.base_url,
            urlencoding::encode(store_id)
        )
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: tacobell::API_BASE_URL.to_string(),
            timeout: Duration::from_secs(tacobell::DEFAULT_TIMEOUT_SECS),
            user_agent: tacobell::DEFAULT_USER_AGENT.to_string(),
            cache_buster: true,
        }
    }
}

/// Taco Bell web services constants
pub mod tacobell {
    /// Base URL for the Taco Bell web services
    pub const API_BASE_URL: &str = "https://www.tacobell.com/tacobellwebservices/v4/tacobell";

    /// Public site, used for referer headers
    pub const SITE_URL: &str = "https://www.tacobell.com";

    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TacoBellMcpError;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url, tacobell::API_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.cache_buster);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(|var| match var {
            ENV_BASE_URL => Some("http://127.0.0.1:9000/api/".to_string()),
            ENV_TIMEOUT_SECS => Some("5".to_string()),
            ENV_USER_AGENT => Some("test-agent".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:9000/api");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let err = Config::from_lookup(|var| (var == ENV_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, TacoBellMcpError::Config(ConfigError::InvalidEnvVar { .. })));

        let err = Config::default().with_timeout(Duration::ZERO).unwrap_err();
        assert!(matches!(err, TacoBellMcpError::Config(_)));
    }

    #[test]
    fn test_cache_buster_toggle() {
        let config = Config::from_lookup(|var| (var == ENV_CACHE_BUSTER).then(|| "false".to_string()))
            .unwrap();
        assert!(!config.cache_buster);

        let config = Config::from_lookup(|var| (var == ENV_CACHE_BUSTER).then(|| " ON ".to_string()))
            .unwrap();
        assert!(config.cache_buster);

        let err = Config::from_lookup(|var| (var == ENV_CACHE_BUSTER).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, TacoBellMcpError::Config(ConfigError::InvalidEnvVar { .. })));

        assert!(!Config::default().with_cache_buster(false).cache_buster);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = Config::default().with_base_url("ftp://example.com").unwrap_err();
        assert!(matches!(err, TacoBellMcpError::Config(_)));
    }

    #[test]
    fn test_endpoint_urls() {
        let config = Config::default().with_base_url("http://localhost:8080").unwrap();
        assert_eq!(config.stores_url(), "http://localhost:8080/stores");
        assert_eq!(
            config.menu_url("042266"),
            "http://localhost:8080/products/menu/042266"
        );
        assert_eq!(
            config.menu_url("a/b c"),
            "http://localhost:8080/products/menu/a%2Fb%20c"
        );
    }
}
