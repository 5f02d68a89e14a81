/// Data fetcher: turns request parameters into projected category data.
///
/// One call to [`DataFetcher::fetch_category_data`] corresponds to one page
/// load in the dashboard or one `pollen-gauge gauges` invocation:
///
/// 1. Resolve the requested date and compute the UTC window.
/// 2. Serve a fresh cached response unless the caller bypasses the cache.
/// 3. Otherwise issue one batched API request for all category codes.
/// 4. Project the response onto the requested codes (missing → `None`).
/// 5. Overwrite the cache slot with the projection and return it.
///
/// A cached response is returned exactly as stored. In single-slot mode
/// (`cache.key_by_request = false`) that means a fresh entry fetched for a
/// different date or category set is served as-is.
use std::fmt;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::api::{SensorApiClient, SensorSource};
use crate::cache::{self, CacheStore, FileCache, MemoryCache};
use crate::categories::DEFAULT_CATEGORY;
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::dates::{self, DisplayZone};
use crate::model::{CachedResponse, CategoryData, Interval, RequestKey, TimeWindow};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything the fetcher needs from the layered configuration.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub api_url: String,
    pub api_key: String,
    pub api_timeout_ms: u64,
    pub default_interval: Interval,
    pub default_categories: Vec<String>,
    /// Display timezone for reading times.
    pub timezone: DisplayZone,
    pub cache_enabled: bool,
    pub cache_max_age_ms: u64,
    /// Only serve a cached entry produced by the same date, interval and
    /// category codes.
    pub key_by_request: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            api_timeout_ms: 15_000,
            default_interval: Interval::Hour,
            default_categories: vec![DEFAULT_CATEGORY.to_string()],
            timezone: DisplayZone::Local,
            cache_enabled: true,
            cache_max_age_ms: cache::DEFAULT_MAX_AGE_MS,
            key_by_request: true,
        }
    }
}

impl FetcherConfig {
    /// Derive the fetcher settings from the full application config. An
    /// unparseable timezone falls back to local time.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_url: config.api.url.clone(),
            api_key: config.api.key.clone(),
            api_timeout_ms: config.api.timeout_ms,
            default_interval: config.request.default_interval,
            default_categories: config.request.default_categories.clone(),
            timezone: DisplayZone::parse(&config.request.timezone).unwrap_or_default(),
            cache_enabled: config.cache.enabled,
            cache_max_age_ms: config.cache.max_age_ms,
            key_by_request: config.cache.key_by_request,
        }
    }

    pub fn cache_max_age(&self) -> TimeDelta {
        cache::max_age_from_ms(self.cache_max_age_ms)
    }
}

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// Parameters of one fetch, mirroring the dashboard query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    /// Requested codes in gauge order. Empty means the configured defaults.
    pub category_codes: Vec<String>,
    /// Raw `YYYY-MM-DD`; `None` means today.
    pub date: Option<String>,
    /// `None` means the configured default interval.
    pub interval: Option<Interval>,
    /// Force a live fetch regardless of cache freshness.
    pub no_cache: bool,
}

impl FetchRequest {
    pub fn new(category_codes: Vec<String>) -> Self {
        Self {
            category_codes,
            ..Self::default()
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn bypass_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    fn has_explicit_date(&self) -> bool {
        self.date.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

/// Where the returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Cache,
    Live,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => f.write_str("cache"),
            Self::Live => f.write_str("live"),
        }
    }
}

/// Result of a fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub date: NaiveDate,
    pub window: TimeWindow,
    pub interval: Interval,
    pub source: DataSource,
    pub fetched_at: DateTime<Utc>,
    pub data: CategoryData,
    /// Set when the live response could not be written to the cache.
    pub cache_warning: Option<String>,
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

pub struct DataFetcher {
    config: FetcherConfig,
    source: Box<dyn SensorSource>,
    cache: Box<dyn CacheStore>,
    clock: Box<dyn Clock>,
}

impl DataFetcher {
    pub fn new(
        config: FetcherConfig,
        source: impl SensorSource + 'static,
        cache: impl CacheStore + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        Self {
            config,
            source: Box::new(source),
            cache: Box::new(cache),
            clock: Box::new(clock),
        }
    }

    /// Fetcher wired to the real API, the on-disk cache and the wall clock.
    /// Falls back to an in-memory cache when there is no home directory.
    pub fn live(config: FetcherConfig) -> Self {
        let source = SensorApiClient::from_config(&config);
        let cache: Box<dyn CacheStore> = match FileCache::default_location() {
            Some(file) => Box::new(file),
            None => Box::new(MemoryCache::new()),
        };
        Self::new(config, source, cache, SystemClock)
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    /// Current time according to the fetcher's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Fetch projected category data for `request`.
    ///
    /// Fails on a malformed date, a transport error, a non-success status or
    /// a body that is not the expected JSON. A failed cache write does not
    /// fail the fetch; it is reported in [`FetchOutcome::cache_warning`].
    pub fn fetch_category_data(&mut self, request: &FetchRequest) -> Result<FetchOutcome> {
        let date = dates::resolve_requested_date(request.date.as_deref(), self.clock.today())?;
        let interval = request.interval.unwrap_or(self.config.default_interval);
        let mut window = dates::to_utc_window(date);
        let now = self.clock.now();
        // East of UTC the local day can begin before its 00:00Z window does;
        // clipping then would leave an empty window, so keep the whole day.
        if !request.has_explicit_date() && now >= window.start {
            window = window.clipped_to(now);
        }

        let codes = if request.category_codes.is_empty() {
            self.config.default_categories.clone()
        } else {
            request.category_codes.clone()
        };
        let key = RequestKey {
            date,
            interval,
            categories: codes.clone(),
        };

        if self.config.cache_enabled
            && !request.no_cache
            && let Some(entry) = self.usable_cache_entry(&key)
        {
            return Ok(FetchOutcome {
                date,
                window,
                interval,
                source: DataSource::Cache,
                fetched_at: entry.fetched_at,
                data: entry.payload,
                cache_warning: None,
            });
        }

        let response = self.source.fetch(interval, &window)?;
        let data = response.project(&codes);
        let fetched_at = self.clock.now();

        let mut cache_warning = None;
        if self.config.cache_enabled {
            let entry = CachedResponse {
                fetched_at,
                request: key,
                payload: data.clone(),
            };
            if let Err(e) = self.cache.write(&entry) {
                cache_warning = Some(format!("{e:#}"));
            }
        }

        Ok(FetchOutcome {
            date,
            window,
            interval,
            source: DataSource::Live,
            fetched_at,
            data,
            cache_warning,
        })
    }

    fn usable_cache_entry(&self, key: &RequestKey) -> Option<CachedResponse> {
        let entry = self.cache.read()?;
        if !cache::is_fresh(&entry, self.clock.now(), self.config.cache_max_age()) {
            return None;
        }
        if self.config.key_by_request && entry.request != *key {
            return None;
        }
        Some(entry)
    }
}
