//! JSON API handlers for the dashboard.
//!
//! Each handler corresponds to an API endpoint and returns a [`Reply`] with
//! JSON content.

use anyhow::Result;
use serde::Serialize;

use crate::activity::logger::fetch_log_path;
use crate::cache;
use crate::dates;
use crate::model::GaugeReading;

use super::{Dashboard, PageQuery, Reply};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

/// Readings API response.
#[derive(Serialize)]
struct ReadingsResponse<'a> {
    date: String,
    label: String,
    interval: String,
    source: String,
    fetched_at: String,
    categories: &'a [String],
    unknown_categories: &'a [String],
    readings: &'a [GaugeReading],
}

/// Health API response.
#[derive(Serialize)]
struct HealthResponse {
    api_url_configured: bool,
    api_key_configured: bool,
    timezone: String,
    cache_enabled: bool,
    cache_path: Option<String>,
    cached_at: Option<String>,
    cache_fresh: bool,
    log_path: Option<String>,
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/readings?date=&categoryCodes=&interval=&noCache=`: the gauge
/// readings for one fetch.
pub fn get_readings(dashboard: &mut Dashboard, url: &str) -> Result<Reply> {
    let query = PageQuery::from_url(url);
    let fetched = match dashboard.fetch(&query) {
        Ok(fetched) => fetched,
        Err(failure) => return Ok(Reply::error_json(failure.status, &failure.message)),
    };

    let outcome = &fetched.outcome;
    let resp = ReadingsResponse {
        date: outcome.date.to_string(),
        label: dates::to_human_label(outcome.date),
        interval: outcome.interval.to_string(),
        source: outcome.source.to_string(),
        fetched_at: outcome.fetched_at.to_rfc3339(),
        categories: &fetched.codes,
        unknown_categories: &fetched.unknown,
        readings: &fetched.readings,
    };
    Reply::json(200, &resp)
}

/// `GET /api/health`: configuration and cache status.
pub fn get_health(dashboard: &Dashboard) -> Result<Reply> {
    let config = dashboard.fetcher.config();
    let cached = dashboard.fetcher.cache().read();
    let now = dashboard.fetcher.now();

    let resp = HealthResponse {
        api_url_configured: !config.api_url.trim().is_empty(),
        api_key_configured: !config.api_key.is_empty(),
        timezone: config.timezone.to_string(),
        cache_enabled: config.cache_enabled,
        cache_path: dashboard
            .fetcher
            .cache()
            .location()
            .map(|p| p.display().to_string()),
        cached_at: cached.as_ref().map(|e| e.fetched_at.to_rfc3339()),
        cache_fresh: cached
            .as_ref()
            .is_some_and(|e| cache::is_fresh(e, now, config.cache_max_age())),
        log_path: fetch_log_path().map(|p| p.display().to_string()),
    };
    Reply::json(200, &resp)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use chrono::{TimeDelta, TimeZone, Utc};
    use tiny_http::Method;

    use super::*;
    use crate::api::{ApiCategory, ApiResponse, SensorSource};
    use crate::cache::{CacheStore, FileCache, MemoryCache};
    use crate::clock::FixedClock;
    use crate::config::schema::LoggingConfig;
    use crate::dates::DisplayZone;
    use crate::fetcher::{DataFetcher, FetcherConfig};
    use crate::model::{Interval, TimeWindow};

    struct OneCategory(Rc<Cell<usize>>);

    impl SensorSource for OneCategory {
        fn fetch(&self, _interval: Interval, _window: &TimeWindow) -> Result<ApiResponse> {
            self.0.set(self.0.get() + 1);
            Ok(ApiResponse {
                moments: vec!["2024-09-12T09:00:00Z".to_string()],
                categories: vec![ApiCategory {
                    code: "GRA".to_string(),
                    description: "Grass".to_string(),
                    ppm3: vec![Some(3.0)],
                    misery: None,
                }],
            })
        }
    }

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 12, 12, 0, 0).unwrap()
    }

    fn dashboard() -> (Dashboard, Rc<Cell<usize>>) {
        dashboard_with(MemoryCache::new(), Rc::new(FixedClock::at(t0())))
    }

    fn dashboard_with(
        cache: impl CacheStore + 'static,
        clock: Rc<FixedClock>,
    ) -> (Dashboard, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let fetcher = DataFetcher::new(
            FetcherConfig {
                timezone: DisplayZone::Utc,
                ..FetcherConfig::default()
            },
            OneCategory(Rc::clone(&calls)),
            cache,
            clock,
        );
        let logging = LoggingConfig {
            enabled: false,
            verbose: false,
        };
        (Dashboard::new(fetcher, &logging), calls)
    }

    #[test]
    fn readings_json_reports_unavailable_misery() {
        let (mut dash, _) = dashboard();
        let reply = dash
            .dispatch(&Method::Get, "/api/readings?date=2024-09-12&categoryCodes=GRA")
            .unwrap();
        assert_eq!(reply.status, 200);

        let json: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(json["source"], "live");
        assert_eq!(json["label"], "Thursday, September 12, 2024");
        assert_eq!(json["readings"][0]["category_label"], "Grass");
        assert_eq!(json["readings"][0]["time_label"], "9:00 AM");
        assert_eq!(json["readings"][0]["misery"], "unavailable");
    }

    #[test]
    fn second_request_is_served_from_cache() {
        let (mut dash, calls) = dashboard();
        let url = "/api/readings?date=2024-09-12&categoryCodes=GRA";
        dash.dispatch(&Method::Get, url).unwrap();
        let reply = dash.dispatch(&Method::Get, url).unwrap();

        let json: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(json["source"], "cache");
        assert_eq!(calls.get(), 1);

        let reply = dash
            .dispatch(&Method::Get, &format!("{url}&noCache=true"))
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(json["source"], "live");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn readings_error_is_json() {
        let (mut dash, _) = dashboard();
        let reply = dash.dispatch(&Method::Get, "/api/readings?date=yesterday").unwrap();
        assert_eq!(reply.status, 400);
        let json: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("yesterday"));
    }

    #[test]
    fn health_reports_cache_state() {
        let (mut dash, _) = dashboard();
        let reply = dash.dispatch(&Method::Get, "/api/health").unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(json["api_url_configured"], false);
        assert!(json["cached_at"].is_null());

        dash.dispatch(&Method::Get, "/api/readings?date=2024-09-12").unwrap();
        let reply = dash.dispatch(&Method::Get, "/api/health").unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(json["cached_at"], "2024-09-12T12:00:00+00:00");
        assert_eq!(json["cache_fresh"], true);
        assert!(json["cache_path"].is_null());
    }

    #[test]
    fn health_freshness_follows_fetcher_clock() {
        let clock = Rc::new(FixedClock::at(t0()));
        let (mut dash, _) = dashboard_with(MemoryCache::new(), Rc::clone(&clock));
        dash.dispatch(&Method::Get, "/api/readings?date=2024-09-12").unwrap();

        clock.advance(TimeDelta::hours(2));
        let reply = dash.dispatch(&Method::Get, "/api/health").unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(json["cache_fresh"], false);
    }

    #[test]
    fn health_reports_file_cache_path() {
        let path = std::env::temp_dir().join(format!(
            "pollen-gauge-health-{}.json",
            std::process::id()
        ));
        let (mut dash, _) = dashboard_with(FileCache::at(&path), Rc::new(FixedClock::at(t0())));
        let reply = dash.dispatch(&Method::Get, "/api/health").unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(json["cache_path"], path.display().to_string());
    }
}
