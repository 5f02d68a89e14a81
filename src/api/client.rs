/// Synchronous HTTP client for the sensor API, built on `ureq`.
///
/// Issues one `GET <url>?interval=..&starting=..&ending=..` per fetch with
/// the API key in the `X-Ps-Key` header. Created from a [`FetcherConfig`] and
/// used for a single CLI invocation or dashboard request.
use std::time::Duration;

use anyhow::{Context, Result, bail};

use super::{API_KEY_HEADER, ApiResponse, SensorSource};
use crate::dates::format_api_timestamp;
use crate::fetcher::FetcherConfig;
use crate::model::{Interval, TimeWindow};

#[derive(Debug, Clone)]
pub struct SensorApiClient {
    url: String,
    api_key: String,
    timeout: Duration,
}

impl SensorApiClient {
    /// Build a client from the resolved fetcher config.
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            url: config.api_url.trim().to_string(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_millis(config.api_timeout_ms),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Query parameters for one windowed request, in the order they are sent.
pub fn query_pairs(interval: Interval, window: &TimeWindow) -> [(&'static str, String); 3] {
    [
        ("interval", interval.as_str().to_string()),
        ("starting", format_api_timestamp(window.start)),
        ("ending", format_api_timestamp(window.end)),
    ]
}

impl SensorSource for SensorApiClient {
    fn fetch(&self, interval: Interval, window: &TimeWindow) -> Result<ApiResponse> {
        if self.url.is_empty() {
            bail!("api.url is not configured (set it with `pollen-gauge config set api.url <URL>`)");
        }

        let mut request = ureq::get(&self.url).timeout(self.timeout);
        if self.has_api_key() {
            request = request.set(API_KEY_HEADER, &self.api_key);
        }
        for (key, value) in query_pairs(interval, window) {
            request = request.query(key, &value);
        }

        let response = match request.call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => {
                bail!("sensor API returned HTTP {code} {}", resp.status_text())
            }
            Err(e) => return Err(e).context("sensor API request failed"),
        };

        response
            .into_json::<ApiResponse>()
            .context("sensor API response was not valid JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::to_utc_window;
    use chrono::NaiveDate;

    #[test]
    fn query_pairs_for_day_window() {
        let window = to_utc_window(NaiveDate::from_ymd_opt(2024, 9, 12).unwrap());
        let pairs = query_pairs(Interval::Day, &window);
        assert_eq!(pairs[0], ("interval", "day".to_string()));
        assert_eq!(pairs[1], ("starting", "2024-09-12T00:00:00.000Z".to_string()));
        assert_eq!(pairs[2], ("ending", "2024-09-12T23:59:59.000Z".to_string()));
    }

    #[test]
    fn client_from_config() {
        let config = FetcherConfig {
            api_url: " https://sensors.example.test/v2/readings ".to_string(),
            api_key: "secret".to_string(),
            api_timeout_ms: 2500,
            ..FetcherConfig::default()
        };
        let client = SensorApiClient::from_config(&config);
        assert_eq!(client.endpoint(), "https://sensors.example.test/v2/readings");
        assert!(client.has_api_key());
        assert_eq!(client.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn unconfigured_url_fails_without_network() {
        let client = SensorApiClient::from_config(&FetcherConfig::default());
        let window = to_utc_window(NaiveDate::from_ymd_opt(2024, 9, 12).unwrap());
        let err = client.fetch(Interval::Hour, &window).unwrap_err();
        assert!(err.to_string().contains("api.url"));
    }
}
