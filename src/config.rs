//! Server configuration
//!
//! All configuration is resolved once at startup (flags + environment) into
//! an immutable `ServerConfig` that is passed by reference into the server
//! bootstrap and middleware constructors. Nothing here is mutated after
//! construction.

use crate::error::ConfigError;
use clap::ValueEnum;
use std::collections::HashSet;

/// Transport used to carry MCP messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportMode {
    /// JSON-RPC framed over standard input/output
    Stdio,
    /// Streamable HTTP served on 0.0.0.0:<port>
    StreamableHttp,
}

/// Tool categories the server knows about. Used only to warn about
/// `--tools` values that cannot match anything.
pub const KNOWN_CATEGORIES: &[&str] = &["app", "events", "infra", "trending", "website"];

/// Rate limiter settings (token bucket shared across requests)
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Sustained refill rate in requests per second
    pub requests_per_second: f64,
    /// Burst capacity (initial and maximum bucket level)
    pub burst_capacity: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 100.0,
            burst_capacity: 20,
        }
    }
}

/// Retry settings for transient Instana API failures
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt
    pub max_retries: u32,
    /// Base backoff delay, doubled on each subsequent retry
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
        }
    }
}

/// Immutable process configuration assembled in `main`
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub transport: TransportMode,
    pub port: u16,
    /// `None` means no filtering: all registered tools are visible
    pub categories: Option<HashSet<String>>,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::Stdio,
            port: 8080,
            categories: None,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Instana API credentials, read from the environment
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_token: String,
    pub base_url: String,
}

impl Credentials {
    /// Read `INSTANA_API_TOKEN` / `INSTANA_BASE_URL`. Both must be
    /// non-empty; in stdio mode a failure here is fatal at startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var("INSTANA_API_TOKEN").unwrap_or_default();
        let base_url = std::env::var("INSTANA_BASE_URL").unwrap_or_default();

        if api_token.is_empty() || base_url.is_empty() {
            return Err(ConfigError::MissingCredentials);
        }

        Ok(Self {
            api_token,
            base_url,
        })
    }
}

/// Parse the `--tools` flag into a category selection.
///
/// Unknown category names are kept (they may simply match no tool) but
/// logged, so typos are visible instead of silently yielding an empty
/// tool list.
pub fn parse_categories(tools: Option<&str>) -> Option<HashSet<String>> {
    let raw = tools?;

    let categories: HashSet<String> = raw
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    if categories.is_empty() {
        return None;
    }

    for category in &categories {
        if !KNOWN_CATEGORIES.contains(&category.as_str()) {
            tracing::warn!(
                "Unknown tool category '{}' (known: {})",
                category,
                KNOWN_CATEGORIES.join(", ")
            );
        }
    }

    Some(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_categories_none() {
        assert!(parse_categories(None).is_none());
        assert!(parse_categories(Some("")).is_none());
        assert!(parse_categories(Some(" , ")).is_none());
    }

    #[test]
    fn test_parse_categories_splits_and_trims() {
        let selection = parse_categories(Some("app, events,infra")).unwrap();
        assert_eq!(selection.len(), 3);
        assert!(selection.contains("app"));
        assert!(selection.contains("events"));
        assert!(selection.contains("infra"));
    }

    #[test]
    fn test_parse_categories_keeps_unknown_names() {
        // Unknown categories warn but are kept verbatim
        let selection = parse_categories(Some("nosuchcategory")).unwrap();
        assert!(selection.contains("nosuchcategory"));
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.port, 8080);
        assert!(config.categories.is_none());
        assert_eq!(config.rate_limit.requests_per_second, 100.0);
        assert_eq!(config.rate_limit.burst_capacity, 20);
        assert_eq!(config.retry.max_retries, 3);
    }
}
