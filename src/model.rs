/// Core data types shared by the fetcher, the cache store and the gauge
/// renderers.
///
/// The sensor API returns a sparse time series: one shared `Moments` array
/// and, per category, a `PPM3` array (and optionally a `Misery` array) that
/// is index-aligned with it. Gaps are `null` on the wire and `None` here.
use std::fmt;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request parameters
// ---------------------------------------------------------------------------

/// Aggregation interval understood by the sensor API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interval {
    #[default]
    Hour,
    Day,
}

impl Interval {
    /// Query-string value sent to the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    /// Parse `hour` / `day` (case-insensitive). Anything else is `None`.
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "hour" | "hourly" => Some(Self::Hour),
            "day" | "daily" => Some(Self::Day),
            _ => None,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UTC time range requested from the API. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Midnight-to-now variant of a day window, used when the caller did not
    /// ask for a specific date. `end` never moves before `start`.
    pub fn clipped_to(self, now: DateTime<Utc>) -> Self {
        Self {
            start: self.start,
            end: now.clamp(self.start, self.end),
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Identifies the request that produced a cached response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestKey {
    pub date: NaiveDate,
    pub interval: Interval,
    pub categories: Vec<String>,
}

// ---------------------------------------------------------------------------
// Series data
// ---------------------------------------------------------------------------

/// One category's time series, aligned with the response's moments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySeries {
    pub code: String,
    pub description: String,
    pub ppm_values: Vec<Option<f64>>,
    /// Normalized 0–1 discomfort index. Not every category carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misery_values: Option<Vec<Option<f64>>>,
}

/// Projected response: the shared moments plus one slot per requested
/// category code, in request order. A slot is `None` when the API returned
/// no series for that code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryData {
    pub moments: Vec<String>,
    pub categories: Vec<Option<CategorySeries>>,
}

impl CategoryData {
    /// Number of requested categories that matched a series.
    pub fn matched(&self) -> usize {
        self.categories.iter().filter(|c| c.is_some()).count()
    }
}

/// The single cached slot: the last projected response and when it was
/// fetched. Timestamps are stored as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    #[serde(rename = "fetched_at_ms", with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
    pub request: RequestKey,
    pub payload: CategoryData,
}

// ---------------------------------------------------------------------------
// Derived readings
// ---------------------------------------------------------------------------

/// Misery index expressed as a 0–100 percentage, or unavailable when the
/// category carries no misery value at the selected moment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiseryPercent {
    Percent(f64),
    Unavailable,
}

impl MiseryPercent {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Percent(v) => Some(*v),
            Self::Unavailable => None,
        }
    }
}

impl fmt::Display for MiseryPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(v) => write!(f, "{v:.2}%"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// What a gauge draws for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeReading {
    /// Position of the category in the request; identifies the gauge surface.
    pub slot: usize,
    pub code: String,
    pub category_label: String,
    /// Raw moment string from the API.
    pub moment: Option<String>,
    /// Moment formatted for display ("3:00 PM").
    pub time_label: String,
    pub ppm: f64,
    pub misery: MiseryPercent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn interval_parsing() {
        assert_eq!(Interval::parse("hour"), Some(Interval::Hour));
        assert_eq!(Interval::parse("DAY"), Some(Interval::Day));
        assert_eq!(Interval::parse(" daily "), Some(Interval::Day));
        assert_eq!(Interval::parse("week"), None);
        assert_eq!(Interval::Hour.to_string(), "hour");
    }

    #[test]
    fn clipped_window_never_precedes_start() {
        let start = Utc.with_ymd_and_hms(2024, 9, 12, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 9, 12, 23, 59, 59).unwrap();
        let window = TimeWindow { start, end };

        let noon = Utc.with_ymd_and_hms(2024, 9, 12, 12, 0, 0).unwrap();
        assert_eq!(window.clipped_to(noon).end, noon);

        let before = Utc.with_ymd_and_hms(2024, 9, 11, 22, 0, 0).unwrap();
        assert_eq!(window.clipped_to(before).end, start);

        let after = Utc.with_ymd_and_hms(2024, 9, 13, 1, 0, 0).unwrap();
        assert_eq!(window.clipped_to(after).end, end);
    }

    #[test]
    fn cached_response_stores_epoch_millis() {
        let entry = CachedResponse {
            fetched_at: Utc.timestamp_millis_opt(1_726_099_200_123).unwrap(),
            request: RequestKey {
                date: NaiveDate::from_ymd_opt(2024, 9, 12).unwrap(),
                interval: Interval::Hour,
                categories: vec!["POL".to_string()],
            },
            payload: CategoryData::default(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"fetched_at_ms\":1726099200123"));
        assert!(json.contains("\"interval\":\"hour\""));
    }

    #[test]
    fn misery_display() {
        assert_eq!(MiseryPercent::Percent(34.5).to_string(), "34.50%");
        assert_eq!(MiseryPercent::Unavailable.to_string(), "unavailable");
        assert_eq!(MiseryPercent::Unavailable.value(), None);
    }
}
