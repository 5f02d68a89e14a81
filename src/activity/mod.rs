//! Activity logging and history reporting.
//!
//! Every fetch, from the CLI or the dashboard, appends one JSONL entry to
//! `~/.pollen-gauge/fetch-log.jsonl` (see [`logger`]). `pollen-gauge history`
//! reads the log back and summarizes it (see [`summarize`]).

pub mod logger;

use logger::FetchLogEntry;

/// Print a diagnostic line to stderr when verbose logging is on.
pub fn debug(verbose: bool, message: &str) {
    if verbose {
        eprintln!("[pollen-gauge] {message}");
    }
}

/// Print a warning line to stderr.
pub fn warn(message: &str) {
    eprintln!("[pollen-gauge] warning: {message}");
}

/// Aggregate counts over a set of log entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySummary {
    pub total: usize,
    pub live: usize,
    pub cache: usize,
    pub errors: usize,
    /// Mean latency of live fetches, in milliseconds.
    pub avg_live_latency_ms: Option<u64>,
}

impl HistorySummary {
    /// Share of successful fetches served from the cache, as a percentage.
    pub fn cache_hit_pct(&self) -> f64 {
        let served = self.live + self.cache;
        if served == 0 {
            0.0
        } else {
            self.cache as f64 / served as f64 * 100.0
        }
    }
}

pub fn summarize(entries: &[FetchLogEntry]) -> HistorySummary {
    let mut summary = HistorySummary {
        total: entries.len(),
        ..HistorySummary::default()
    };

    let mut latency_total = 0u64;
    let mut latency_count = 0u64;
    for entry in entries {
        match entry.source.as_str() {
            "live" => {
                summary.live += 1;
                if let Some(ms) = entry.latency_ms {
                    latency_total += ms;
                    latency_count += 1;
                }
            }
            "cache" => summary.cache += 1,
            _ => summary.errors += 1,
        }
    }

    if latency_count > 0 {
        summary.avg_live_latency_ms = Some(latency_total / latency_count);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, latency_ms: Option<u64>) -> FetchLogEntry {
        FetchLogEntry {
            timestamp: String::new(),
            surface: "cli".to_string(),
            date: "2024-09-12".to_string(),
            interval: "hour".to_string(),
            categories: Vec::new(),
            source: source.to_string(),
            gauges: 0,
            latency_ms,
            error: None,
        }
    }

    #[test]
    fn summary_counts_sources() {
        let entries = vec![
            entry("live", Some(200)),
            entry("live", Some(400)),
            entry("cache", Some(1)),
            entry("error", None),
        ];
        let summary = summarize(&entries);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.live, 2);
        assert_eq!(summary.cache, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.avg_live_latency_ms, Some(300));
        assert!((summary.cache_hit_pct() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary, HistorySummary::default());
        assert_eq!(summary.cache_hit_pct(), 0.0);
    }
}
