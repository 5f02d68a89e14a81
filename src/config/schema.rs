/// Configuration schema and defaults.
///
/// Defines the TOML-serializable configuration with sections `[api]`,
/// `[request]`, `[cache]`, `[logging]` and `[web]`. Every field has a
/// built-in default; users only set what they want to override.
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_MAX_AGE_MS;
use crate::categories::DEFAULT_CATEGORY;
use crate::model::Interval;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration, mapping to `~/.pollen-gauge/config.toml` and
/// `.pollen-gauge.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub request: RequestConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub web: WebConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Sensor API endpoint and credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Full endpoint URL; query parameters are appended per request.
    pub url: String,
    /// Static key sent in the `X-Ps-Key` header.
    pub key: String,
    /// Request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            key: String::new(),
            timeout_ms: 15_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [request]
// ---------------------------------------------------------------------------

/// Defaults applied when a request leaves a parameter out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// `hour` or `day`.
    pub default_interval: Interval,
    /// Category codes used when none are given.
    pub default_categories: Vec<String>,
    /// Display timezone for reading times: `local`, `utc`, `+HH:MM` or an
    /// IANA name such as `America/Chicago`.
    pub timezone: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            default_interval: Interval::Hour,
            default_categories: vec![DEFAULT_CATEGORY.to_string()],
            timezone: "local".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [cache]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Freshness window (milliseconds).
    pub max_age_ms: u64,
    /// Only reuse a cached response fetched for the same date, interval and
    /// category codes. `false` reuses any fresh response.
    pub key_by_request: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_ms: DEFAULT_MAX_AGE_MS,
            key_by_request: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append one entry per fetch to `~/.pollen-gauge/fetch-log.jsonl`.
    pub enabled: bool,
    /// Print diagnostics (cache decisions, request window) to stderr.
    pub verbose: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            verbose: false,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address for `pollen-gauge serve`.
    pub addr: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Annotated default config written by `pollen-gauge config init`.
    pub fn default_toml() -> &'static str {
        DEFAULT_TOML
    }

    /// Copy with the API key masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api.key.is_empty() {
            copy.api.key = "********".to_string();
        }
        copy
    }
}

const DEFAULT_TOML: &str = r#"# pollen-gauge configuration
#
# Precedence (highest last): built-in defaults, this file,
# .pollen-gauge.toml in the working directory, POLLEN_GAUGE_* env vars.

[api]
# Sensor endpoint, e.g. "https://sensors.example.com/v1/readings"
url = ""
# Sent as the X-Ps-Key header
key = ""
timeout_ms = 15000

[request]
# "hour" or "day"
default_interval = "hour"
default_categories = ["POL"]
# "local", "utc", a fixed offset such as "-06:00", or an IANA zone
# name such as "America/Chicago"
timezone = "local"

[cache]
enabled = true
# One hour
max_age_ms = 3600000
# Only reuse a cached response for the same date, interval and categories
key_by_request = true

[logging]
enabled = true
verbose = false

[web]
addr = "127.0.0.1:9747"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_matches_defaults() {
        let parsed: AppConfig = toml::from_str(DEFAULT_TOML).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
[api]
key = "abc"

[request]
default_interval = "day"
"#,
        )
        .unwrap();
        assert_eq!(parsed.api.key, "abc");
        assert_eq!(parsed.api.timeout_ms, 15_000);
        assert_eq!(parsed.request.default_interval, Interval::Day);
        assert_eq!(parsed.request.default_categories, vec!["POL"]);
        assert!(parsed.cache.enabled);
    }

    #[test]
    fn redacted_masks_key() {
        let mut config = AppConfig::default();
        assert_eq!(config.redacted().api.key, "");
        config.api.key = "secret".to_string();
        assert_eq!(config.redacted().api.key, "********");
    }
}
