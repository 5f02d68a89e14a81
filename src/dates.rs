/// Date and time formatting for requests and display.
///
/// Request windows are always whole UTC days (`00:00:00Z` to `23:59:59Z`).
/// Display times are rendered in the configured [`DisplayZone`].
use std::fmt;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::model::TimeWindow;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("date regex must compile")
});

static OFFSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])(\d{2}):?(\d{2})$").expect("offset regex must compile")
});

/// Seconds from `00:00:00` to `23:59:59`.
const LAST_SECOND_OF_DAY: i64 = 86_399;

// ---------------------------------------------------------------------------
// Requested date
// ---------------------------------------------------------------------------

/// Resolve the `date` parameter to a calendar date.
///
/// Absent or blank input yields `today`. Anything that is not a real
/// `YYYY-MM-DD` date is an error rather than a silently malformed request.
pub fn resolve_requested_date(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(today);
    };

    let caps = DATE_RE
        .captures(raw)
        .with_context(|| format!("invalid date '{raw}': expected YYYY-MM-DD"))?;

    let year: i32 = caps[1].parse().context("invalid year")?;
    let month: u32 = caps[2].parse().context("invalid month")?;
    let day: u32 = caps[3].parse().context("invalid day")?;

    NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid date '{raw}': no such calendar day"))
}

/// Whole-day UTC window for `date`.
pub fn to_utc_window(date: NaiveDate) -> TimeWindow {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    TimeWindow {
        start,
        end: start + TimeDelta::seconds(LAST_SECOND_OF_DAY),
    }
}

/// Long-form label such as `Thursday, September 12, 2024`.
pub fn to_human_label(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// ISO 8601 timestamp in the form the API expects (`2024-09-12T00:00:00.000Z`).
pub fn format_api_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

// ---------------------------------------------------------------------------
// Moments
// ---------------------------------------------------------------------------

/// Parse a moment from the API.
///
/// Accepts RFC 3339 timestamps; naive timestamps without an offset are taken
/// to be UTC.
pub fn parse_moment(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Timezone used for displaying reading times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayZone {
    #[default]
    Local,
    Utc,
    Fixed(FixedOffset),
    /// IANA zone such as `America/Chicago`, with its daylight-saving rules.
    Named(Tz),
}

impl DisplayZone {
    /// Parse `local`, `utc`/`z`, a fixed offset such as `+05:30` / `-0400`,
    /// or an IANA zone name such as `Europe/Paris`.
    pub fn parse(val: &str) -> Option<Self> {
        let val = val.trim();
        match val.to_ascii_lowercase().as_str() {
            "" | "local" => return Some(Self::Local),
            "utc" | "z" | "gmt" => return Some(Self::Utc),
            _ => {}
        }

        let Some(caps) = OFFSET_RE.captures(val) else {
            return val.parse::<Tz>().ok().map(Self::Named);
        };
        let hours: i32 = caps[2].parse().ok()?;
        let minutes: i32 = caps[3].parse().ok()?;
        if minutes >= 60 {
            return None;
        }
        let secs = hours * 3600 + minutes * 60;
        let offset = if &caps[1] == "-" {
            FixedOffset::west_opt(secs)?
        } else {
            FixedOffset::east_opt(secs)?
        };
        Some(Self::Fixed(offset))
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Utc => f.write_str("utc"),
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

/// 12-hour clock time with AM/PM, e.g. `3:00 PM`.
pub fn format_reading_time(moment: DateTime<Utc>, zone: DisplayZone) -> String {
    const FMT: &str = "%-I:%M %p";
    match zone {
        DisplayZone::Local => moment.with_timezone(&Local).format(FMT).to_string(),
        DisplayZone::Utc => moment.format(FMT).to_string(),
        DisplayZone::Fixed(offset) => moment.with_timezone(&offset).format(FMT).to_string(),
        DisplayZone::Named(tz) => moment.with_timezone(&tz).format(FMT).to_string(),
    }
}

/// Display label for a raw moment; falls back to the raw text when it does
/// not parse.
pub fn moment_label(raw: &str, zone: DisplayZone) -> String {
    match parse_moment(raw) {
        Some(ts) => format_reading_time(ts, zone),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn absent_or_blank_date_is_today() {
        let today = ymd(2024, 9, 12);
        assert_eq!(resolve_requested_date(None, today).unwrap(), today);
        assert_eq!(resolve_requested_date(Some("  "), today).unwrap(), today);
    }

    #[test]
    fn parses_iso_date() {
        let today = ymd(2000, 1, 1);
        assert_eq!(
            resolve_requested_date(Some("2024-09-12"), today).unwrap(),
            ymd(2024, 9, 12)
        );
        assert_eq!(
            resolve_requested_date(Some(" 2024-02-29 "), today).unwrap(),
            ymd(2024, 2, 29)
        );
    }

    #[test]
    fn rejects_malformed_dates() {
        let today = ymd(2000, 1, 1);
        for raw in ["2024-9-12", "12/09/2024", "2024-13-01", "2023-02-29", "yesterday"] {
            assert!(
                resolve_requested_date(Some(raw), today).is_err(),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn utc_window_covers_whole_day() {
        for date in [ymd(2024, 9, 12), ymd(2024, 2, 29), ymd(1999, 12, 31)] {
            let window = to_utc_window(date);
            assert_eq!(window.start, date.and_hms_opt(0, 0, 0).unwrap().and_utc());
            assert_eq!(window.end, date.and_hms_opt(23, 59, 59).unwrap().and_utc());
            assert!(window.start <= window.end);
        }
    }

    #[test]
    fn api_timestamp_format() {
        let window = to_utc_window(ymd(2024, 9, 12));
        assert_eq!(format_api_timestamp(window.start), "2024-09-12T00:00:00.000Z");
        assert_eq!(format_api_timestamp(window.end), "2024-09-12T23:59:59.000Z");
    }

    #[test]
    fn human_label() {
        assert_eq!(to_human_label(ymd(2024, 9, 12)), "Thursday, September 12, 2024");
        assert_eq!(to_human_label(ymd(2024, 3, 5)), "Tuesday, March 5, 2024");
    }

    #[test]
    fn parses_moments_with_and_without_offset() {
        let expected = Utc.with_ymd_and_hms(2024, 9, 12, 15, 0, 0).unwrap();
        assert_eq!(parse_moment("2024-09-12T15:00:00Z"), Some(expected));
        assert_eq!(parse_moment("2024-09-12T15:00:00.000Z"), Some(expected));
        assert_eq!(parse_moment("2024-09-12T17:00:00+02:00"), Some(expected));
        assert_eq!(parse_moment("2024-09-12T15:00:00"), Some(expected));
        assert_eq!(parse_moment("not a time"), None);
    }

    #[test]
    fn reading_time_is_twelve_hour() {
        let ts = Utc.with_ymd_and_hms(2024, 9, 12, 15, 0, 0).unwrap();
        assert_eq!(format_reading_time(ts, DisplayZone::Utc), "3:00 PM");

        let morning = Utc.with_ymd_and_hms(2024, 9, 12, 0, 5, 0).unwrap();
        assert_eq!(format_reading_time(morning, DisplayZone::Utc), "12:05 AM");

        let minus_four = DisplayZone::parse("-04:00").unwrap();
        assert_eq!(format_reading_time(ts, minus_four), "11:00 AM");
    }

    #[test]
    fn display_zone_parsing() {
        assert_eq!(DisplayZone::parse("local"), Some(DisplayZone::Local));
        assert_eq!(DisplayZone::parse("UTC"), Some(DisplayZone::Utc));
        assert_eq!(
            DisplayZone::parse("+0530"),
            Some(DisplayZone::Fixed(FixedOffset::east_opt(5 * 3600 + 1800).unwrap()))
        );
        assert_eq!(DisplayZone::parse("+05:75"), None);
        assert_eq!(
            DisplayZone::parse("America/Denver"),
            Some(DisplayZone::Named(chrono_tz::America::Denver))
        );
        assert_eq!(DisplayZone::parse("Mars/Olympus"), None);
        assert_eq!(DisplayZone::parse("America/Denver").unwrap().to_string(), "America/Denver");
    }

    #[test]
    fn named_zone_follows_daylight_saving() {
        let chicago = DisplayZone::parse("America/Chicago").unwrap();

        // CST (-06:00) in January, CDT (-05:00) in July.
        let winter = Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap();
        assert_eq!(format_reading_time(winter, chicago), "12:00 PM");

        let summer = Utc.with_ymd_and_hms(2024, 7, 15, 18, 0, 0).unwrap();
        assert_eq!(format_reading_time(summer, chicago), "1:00 PM");
    }

    #[test]
    fn moment_label_falls_back_to_raw() {
        assert_eq!(moment_label("garbage", DisplayZone::Utc), "garbage");
        assert_eq!(moment_label("2024-09-12T09:30:00Z", DisplayZone::Utc), "9:30 AM");
    }
}
