//! Configuration for the scraping module.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for the search and extraction layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Request timeout applied by the HTTP client.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Upper bound for one search backend call.
    #[serde(with = "duration_serde")]
    pub search_timeout: Duration,
    /// Upper bound for one extraction backend call.
    #[serde(with = "duration_serde")]
    pub extract_timeout: Duration,
    /// User agents to rotate.
    pub user_agents: Vec<String>,
    /// Cache configuration.
    pub cache_config: CacheConfig,
    /// Maximum content length to download (bytes).
    pub max_content_length: usize,
    /// Character cap for text produced by fetch-and-strip extraction.
    pub basic_content_cap: usize,
    /// Character cap for text produced by the reader backend.
    pub reader_content_cap: usize,
    /// Market locale used to qualify queries.
    pub locale: MarketLocale,
    /// API keys for various services.
    pub api_keys: ApiKeys,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            search_timeout: Duration::from_secs(15),
            extract_timeout: Duration::from_secs(30),
            user_agents: default_user_agents(),
            cache_config: CacheConfig::default(),
            max_content_length: 10 * 1024 * 1024, // 10 MB
            basic_content_cap: 6_000,
            reader_content_cap: 10_000,
            locale: MarketLocale::default(),
            api_keys: ApiKeys::default(),
        }
    }
}

impl ScrapingConfig {
    /// Create a new config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default settings overlaid with API keys and cache knobs from the
    /// process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_keys = ApiKeys::from_env();

        if let Some(ttl) = env_parse::<u64>("RESEARCH_CACHE_TTL_SECS") {
            config.cache_config.ttl_seconds = ttl;
        }
        if let Some(max) = env_parse::<usize>("RESEARCH_CACHE_MAX_ENTRIES") {
            config.cache_config.max_entries = max;
        }

        config
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set Google Custom Search credentials.
    #[must_use]
    pub fn with_google_api(mut self, api_key: impl Into<String>, cx: impl Into<String>) -> Self {
        self.api_keys.google_api_key = Some(api_key.into());
        self.api_keys.google_cx = Some(cx.into());
        self
    }

    /// Set Brave API key.
    #[must_use]
    pub fn with_brave_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_keys.brave = Some(key.into());
        self
    }

    /// Set Jina Reader API key.
    #[must_use]
    pub fn with_jina_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_keys.jina = Some(key.into());
        self
    }

    /// Set the market locale.
    #[must_use]
    pub fn with_locale(mut self, locale: MarketLocale) -> Self {
        self.locale = locale;
        self
    }

    /// Get a random user agent from the rotation list.
    #[must_use]
    pub fn random_user_agent(&self) -> String {
        if self.user_agents.is_empty() {
            return default_user_agents().swap_remove(0);
        }
        let mut rng = rand::thread_rng();
        let idx = rng.gen_range(0..self.user_agents.len());
        self.user_agents[idx].clone()
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Entry lifetime (seconds); older entries are never served.
    pub ttl_seconds: u64,
    /// Maximum number of entries before least-recently-used eviction.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600, // 1 hour
            max_entries: 1000,
        }
    }
}

/// Market locale used to qualify search queries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketLocale {
    /// Country name appended to queries ("Brazil").
    pub country_name: String,
    /// Adjective form of the country ("brazilian").
    pub demonym: String,
    /// Result language code for search backends.
    pub language: String,
    /// Country code for search backends.
    pub country_code: String,
}

impl Default for MarketLocale {
    fn default() -> Self {
        Self {
            country_name: "Brazil".to_string(),
            demonym: "brazilian".to_string(),
            language: "pt".to_string(),
            country_code: "br".to_string(),
        }
    }
}

/// API keys for various services.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Google Custom Search API key.
    pub google_api_key: Option<String>,
    /// Google Custom Search Engine ID.
    pub google_cx: Option<String>,
    /// Brave Search API key.
    pub brave: Option<String>,
    /// Jina Reader API key.
    pub jina: Option<String>,
}

impl ApiKeys {
    /// Read keys from `GOOGLE_SEARCH_KEY`, `GOOGLE_CSE_ID`, `BRAVE_API_KEY`
    /// and `JINA_API_KEY`. Empty values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            google_api_key: env_non_empty("GOOGLE_SEARCH_KEY"),
            google_cx: env_non_empty("GOOGLE_CSE_ID"),
            brave: env_non_empty("BRAVE_API_KEY"),
            jina: env_non_empty("JINA_API_KEY"),
        }
    }
}

/// Read a non-empty environment variable.
pub(crate) fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse an environment variable, ignoring malformed values.
pub(crate) fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_non_empty(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring malformed environment value");
            None
        }
    }
}

/// Default user agents for rotation.
fn default_user_agents() -> Vec<String> {
    vec![
        // Chrome on Windows
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
        // Chrome on macOS
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
        // Firefox on Windows
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string(),
        // Safari on macOS
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".to_string(),
        // Firefox on Linux
        "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string(),
    ]
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScrapingConfig::default();
        assert_eq!(config.cache_config.ttl_seconds, 3600);
        assert!(config.cache_config.enabled);
        assert_eq!(config.basic_content_cap, 6_000);
        assert_eq!(config.reader_content_cap, 10_000);
        assert_eq!(config.locale.country_name, "Brazil");
    }

    #[test]
    fn test_config_builder() {
        let config = ScrapingConfig::new()
            .with_timeout(Duration::from_secs(60))
            .with_google_api("g-key", "g-cx")
            .with_brave_api_key("b-key")
            .with_jina_api_key("j-key");

        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.api_keys.google_api_key.as_deref(), Some("g-key"));
        assert_eq!(config.api_keys.google_cx.as_deref(), Some("g-cx"));
        assert_eq!(config.api_keys.brave.as_deref(), Some("b-key"));
        assert_eq!(config.api_keys.jina.as_deref(), Some("j-key"));
    }

    #[test]
    fn test_random_user_agent() {
        let config = ScrapingConfig::default();
        let ua = config.random_user_agent();
        assert!(ua.contains("Mozilla"));

        let mut empty = ScrapingConfig::default();
        empty.user_agents.clear();
        assert!(empty.random_user_agent().contains("Mozilla"));
    }

    #[test]
    fn test_config_serde_roundtrip_keeps_durations_in_seconds() {
        let config = ScrapingConfig::default();
        let json = serde_json::to_value(&config).unwrap_or_default();
        assert_eq!(json["search_timeout"], 15);
        assert_eq!(json["extract_timeout"], 30);
    }
}
