use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::fetcher::FetchOutcome;

// ---------------------------------------------------------------------------
// Fetch log entry (JSONL)
// ---------------------------------------------------------------------------

/// A single entry in the activity log (`~/.pollen-gauge/fetch-log.jsonl`).
///
/// One entry is written per fetch attempt, from either the CLI or the
/// dashboard. Read back by `pollen-gauge history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchLogEntry {
    pub timestamp: String,
    /// `"cli"` or `"web"`.
    pub surface: String,
    /// Requested date, or the raw parameter when it did not parse.
    pub date: String,
    pub interval: String,
    pub categories: Vec<String>,
    /// `"cache"`, `"live"` or `"error"`.
    pub source: String,
    /// Number of gauges drawn.
    #[serde(default)]
    pub gauges: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl FetchLogEntry {
    /// Entry for a fetch that produced data.
    pub fn success(
        surface: &str,
        categories: &[String],
        outcome: &FetchOutcome,
        gauges: usize,
        latency_ms: u64,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            surface: surface.to_string(),
            date: outcome.date.to_string(),
            interval: outcome.interval.to_string(),
            categories: categories.to_vec(),
            source: outcome.source.to_string(),
            gauges,
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    /// Entry for a fetch that failed.
    pub fn failure(
        surface: &str,
        date: Option<&str>,
        interval: &str,
        categories: &[String],
        error: &anyhow::Error,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            surface: surface.to_string(),
            date: date.unwrap_or("today").to_string(),
            interval: interval.to_string(),
            categories: categories.to_vec(),
            source: "error".to_string(),
            gauges: 0,
            latency_ms: None,
            error: Some(format!("{error:#}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Append an entry to the default log. Best-effort: failures are ignored so
/// logging never affects rendering.
pub fn log_fetch(entry: &FetchLogEntry) {
    if let Some(path) = fetch_log_path() {
        let _ = append_entry(&path, entry);
    }
}

/// Append an entry to the log at `path`, creating parent directories.
pub fn append_entry(path: &Path, entry: &FetchLogEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read all entries from the default log.
pub fn read_all_entries() -> Vec<FetchLogEntry> {
    match fetch_log_path() {
        Some(path) => read_entries(&path),
        None => Vec::new(),
    }
}

/// Read all entries from `path`, silently skipping malformed lines. A
/// missing file reads as empty.
pub fn read_entries(path: &Path) -> Vec<FetchLogEntry> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<FetchLogEntry>(&line).ok())
        .collect()
}

/// The most recent `limit` entries, oldest first.
pub fn tail(entries: Vec<FetchLogEntry>, limit: usize) -> Vec<FetchLogEntry> {
    let skip = entries.len().saturating_sub(limit);
    entries.into_iter().skip(skip).collect()
}

/// Return the path to the activity log file.
pub fn fetch_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pollen-gauge").join("fetch-log.jsonl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str) -> FetchLogEntry {
        FetchLogEntry {
            timestamp: "2024-09-12T15:00:00+00:00".to_string(),
            surface: "cli".to_string(),
            date: "2024-09-12".to_string(),
            interval: "hour".to_string(),
            categories: vec!["POL".to_string()],
            source: source.to_string(),
            gauges: 1,
            latency_ms: Some(120),
            error: None,
        }
    }

    #[test]
    fn append_and_read_back() {
        let dir = std::env::temp_dir().join(format!("pollen-gauge-log-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("fetch-log.jsonl");

        append_entry(&path, &entry("live")).unwrap();
        append_entry(&path, &entry("cache")).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| writeln!(f, "not json"))
            .unwrap();

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].source, "live");
        assert_eq!(entries[1].source, "cache");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_log_reads_empty() {
        assert!(read_entries(Path::new("/nonexistent/fetch-log.jsonl")).is_empty());
    }

    #[test]
    fn tail_keeps_most_recent() {
        let entries = vec![entry("live"), entry("cache"), entry("error")];
        let last_two = tail(entries.clone(), 2);
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].source, "cache");
        assert_eq!(tail(entries, 10).len(), 3);
    }

    #[test]
    fn failure_entry_keeps_error_chain() {
        let err = anyhow::anyhow!("connection refused").context("sensor API request failed");
        let e = FetchLogEntry::failure("web", None, "hour", &["POL".to_string()], &err);
        assert_eq!(e.source, "error");
        assert_eq!(e.date, "today");
        assert_eq!(
            e.error.as_deref(),
            Some("sensor API request failed: connection refused")
        );
        let json = serde_json::to_string(&e).unwrap();
        assert!(!json.contains("latency_ms"));
    }
}
