use std::fmt;
use std::time::Duration;

use core_config::{env_optional, env_parse, env_required, ConfigError, FromEnv};

pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 200;

/// A validated, non-empty API key
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Trims surrounding whitespace and rejects an empty key
    pub fn new(value: impl AsRef<str>) -> Result<Self, ConfigError> {
        let token = value.as_ref().trim();
        if token.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "api_key".to_string(),
                details: "API key cannot be empty".to_string(),
            });
        }
        Ok(Self(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Connection configuration, immutable once the client is built
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base address, without a trailing `/`
    pub base_url: String,
    pub api_key: Option<ApiKey>,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Extra attempts after the first one for network failures and 5xx
    pub retries: u32,
    /// Backoff before retry `n` (0-based) is `backoff_base * (n + 1)`
    pub backoff_base: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
        }
    }

    /// Managed cluster reachable at `cluster_url`
    pub fn cloud(cluster_url: impl Into<String>) -> Self {
        Self::new(cluster_url)
    }

    /// Self-hosted service at `host:port`, e.g. `local("http://localhost", 8000)`
    pub fn local(host: &str, port: u16) -> Self {
        Self::new(format!("{}:{}", host.trim_end_matches('/'), port))
    }

    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Delay slept after failed attempt `attempt` (0-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt.saturating_add(1))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::local("http://localhost", 8000)
    }
}

impl FromEnv for ClientConfig {
    /// Reads:
    /// - EIGENLAKE_URL (required)
    /// - EIGENLAKE_API_KEY (optional; blank means no key)
    /// - EIGENLAKE_TIMEOUT_SECS (default 20)
    /// - EIGENLAKE_RETRIES (default 2)
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(env_required("EIGENLAKE_URL")?)
            .with_timeout(Duration::from_secs(env_parse(
                "EIGENLAKE_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?))
            .with_retries(env_parse("EIGENLAKE_RETRIES", DEFAULT_RETRIES)?);

        if let Some(key) = env_optional("EIGENLAKE_API_KEY") {
            config = config.with_api_key(ApiKey::new(key)?);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_trims_and_rejects_blank() {
        assert_eq!(ApiKey::new("  secret ").unwrap().expose(), "secret");
        assert!(ApiKey::new("   ").is_err());
        assert_eq!(format!("{:?}", ApiKey::new("secret").unwrap()), "ApiKey(***)");
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let config = ClientConfig::cloud("https://cluster.example.com//");
        assert_eq!(config.base_url, "https://cluster.example.com");
    }

    #[test]
    fn test_local_assembles_host_and_port() {
        assert_eq!(
            ClientConfig::local("http://localhost/", 9000).base_url,
            "http://localhost:9000"
        );
        assert_eq!(ClientConfig::default().base_url, "http://localhost:8000");
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://svc");
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.retries, 2);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_linear_backoff() {
        let config = ClientConfig::new("http://svc");
        assert_eq!(config.backoff_delay(0), Duration::from_millis(200));
        assert_eq!(config.backoff_delay(1), Duration::from_millis(400));
        assert_eq!(config.backoff_delay(4), Duration::from_millis(1000));
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("EIGENLAKE_URL", Some("https://lake.example.com/")),
                ("EIGENLAKE_API_KEY", Some("k-123")),
                ("EIGENLAKE_TIMEOUT_SECS", Some("5")),
                ("EIGENLAKE_RETRIES", Some("0")),
            ],
            || {
                let config = ClientConfig::from_env().unwrap();
                assert_eq!(config.base_url, "https://lake.example.com");
                assert_eq!(config.api_key.unwrap().expose(), "k-123");
                assert_eq!(config.timeout, Duration::from_secs(5));
                assert_eq!(config.retries, 0);
            },
        );
    }

    #[test]
    fn test_from_env_missing_url() {
        temp_env::with_var_unset("EIGENLAKE_URL", || {
            let err = ClientConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("EIGENLAKE_URL"));
        });
    }

    #[test]
    fn test_from_env_blank_key_is_absent() {
        temp_env::with_vars(
            [
                ("EIGENLAKE_URL", Some("http://svc")),
                ("EIGENLAKE_API_KEY", Some("  ")),
                ("EIGENLAKE_TIMEOUT_SECS", None),
                ("EIGENLAKE_RETRIES", None),
            ],
            || {
                let config = ClientConfig::from_env().unwrap();
                assert!(config.api_key.is_none());
                assert_eq!(config.retries, DEFAULT_RETRIES);
            },
        );
    }
}
