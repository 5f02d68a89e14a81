//! CLI command implementations for pollen-gauge.
//!
//! Provides subcommand handlers for:
//! - `pollen-gauge gauges`: fetch readings and draw one gauge per category
//! - `pollen-gauge serve`: run the dashboard
//! - `pollen-gauge categories`: list the category code vocabulary
//! - `pollen-gauge history`: recent fetches from the activity log
//! - `pollen-gauge cache show|clear`: inspect or drop the cached response
//! - `pollen-gauge config show|init|set|reset`: configuration management

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;

use crate::activity::{self, logger::{self, FetchLogEntry}};
use crate::cache::{self, CacheStore, FileCache};
use crate::categories::{self, KNOWN_CATEGORIES};
use crate::config;
use crate::dates::{self, DisplayZone};
use crate::fetcher::{DataFetcher, FetchOutcome, FetcherConfig, FetchRequest};
use crate::gauge::{TerminalGauge, render_all};
use crate::model::{GaugeReading, Interval};
use crate::series::build_readings;
use crate::web::{self, Dashboard};

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// pollen-gauge gauges
// ---------------------------------------------------------------------------

/// Parameters of `pollen-gauge gauges`, named after the dashboard query
/// parameters.
#[derive(Debug, Clone, Default)]
pub struct GaugesArgs {
    pub date: Option<String>,
    pub categories: Option<String>,
    pub interval: Option<String>,
    pub no_cache: bool,
}

/// Fetch readings and draw one gauge per category with data.
///
/// A malformed date or a failed fetch is returned as an error so the process
/// exits non-zero.
pub fn run_gauges(args: &GaugesArgs, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let fetcher_config = FetcherConfig::from_app_config(&cfg);

    if DisplayZone::parse(&cfg.request.timezone).is_none() {
        activity::warn(&format!(
            "unknown timezone '{}', showing local times",
            cfg.request.timezone
        ));
    }

    let codes = categories::parse_category_codes(
        args.categories.as_deref(),
        &fetcher_config.default_categories,
    );
    let unknown = categories::unknown_codes(&codes);
    if !unknown.is_empty() {
        activity::warn(&format!(
            "unknown category codes (requested anyway): {}",
            unknown.join(", ")
        ));
    }

    let mut request = FetchRequest::new(codes.clone());
    if let Some(raw) = args.interval.as_deref() {
        let interval = Interval::parse(raw)
            .with_context(|| format!("invalid interval '{raw}', expected hour or day"))?;
        request = request.with_interval(interval);
    }
    if let Some(date) = &args.date {
        request = request.with_date(date.clone());
    }
    if args.no_cache {
        request = request.bypass_cache();
    }

    let zone = fetcher_config.timezone;
    let interval_label = request
        .interval
        .unwrap_or(fetcher_config.default_interval)
        .to_string();
    let mut fetcher = DataFetcher::live(fetcher_config);

    let started = Instant::now();
    let outcome = match fetcher.fetch_category_data(&request) {
        Ok(outcome) => outcome,
        Err(e) => {
            if cfg.logging.enabled {
                logger::log_fetch(&FetchLogEntry::failure(
                    "cli",
                    args.date.as_deref(),
                    &interval_label,
                    &codes,
                    &e,
                ));
            }
            return Err(e);
        }
    };
    let latency_ms = started.elapsed().as_millis() as u64;

    if let Some(warning) = &outcome.cache_warning {
        activity::warn(&format!("could not write cache: {warning}"));
    }
    activity::debug(
        cfg.logging.verbose,
        &format!(
            "{} fetch, window {} .. {}",
            outcome.source,
            dates::format_api_timestamp(outcome.window.start),
            dates::format_api_timestamp(outcome.window.end),
        ),
    );

    let readings = build_readings(&outcome.data, zone);
    match format {
        OutputFormat::Json => print_readings_json(&outcome, &codes, &readings)?,
        OutputFormat::Csv => print_readings_csv(&readings),
        OutputFormat::Table => print_readings_table(&outcome, &codes, &readings)?,
    }

    if cfg.logging.enabled {
        logger::log_fetch(&FetchLogEntry::success(
            "cli",
            &codes,
            &outcome,
            readings.len(),
            latency_ms,
        ));
    }

    Ok(())
}

fn print_readings_table(
    outcome: &FetchOutcome,
    codes: &[String],
    readings: &[GaugeReading],
) -> Result<()> {
    println!(
        "{}",
        dates::to_human_label(outcome.date).bold().cyan()
    );
    println!(
        "{}",
        format!(
            "{} interval · {} · {} data fetched {}",
            outcome.interval,
            codes.join(", "),
            outcome.source,
            outcome.fetched_at.format("%Y-%m-%d %H:%M UTC"),
        )
        .dimmed()
    );
    println!("{}", "=".repeat(60));
    println!();

    if readings.is_empty() {
        println!(
            "{}",
            "No readings available for the requested categories.".yellow()
        );
        return Ok(());
    }

    let mut sink = TerminalGauge::new(std::io::stdout().lock());
    render_all(&mut sink, readings)?;
    Ok(())
}

fn print_readings_json(
    outcome: &FetchOutcome,
    codes: &[String],
    readings: &[GaugeReading],
) -> Result<()> {
    let value = serde_json::json!({
        "date": outcome.date.to_string(),
        "label": dates::to_human_label(outcome.date),
        "interval": outcome.interval.to_string(),
        "source": outcome.source.to_string(),
        "fetched_at": outcome.fetched_at.to_rfc3339(),
        "categories": codes,
        "readings": readings,
    });

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_readings_csv(readings: &[GaugeReading]) {
    println!("slot,code,label,moment,time,ppm,misery_pct");
    for r in readings {
        println!(
            "{},{},{},{},{},{},{}",
            r.slot,
            csv_field(&r.code),
            csv_field(&r.category_label),
            r.moment.as_deref().unwrap_or(""),
            csv_field(&r.time_label),
            r.ppm,
            r.misery.value().map(|v| format!("{v:.2}")).unwrap_or_default(),
        );
    }
}

// ---------------------------------------------------------------------------
// pollen-gauge serve
// ---------------------------------------------------------------------------

/// Run the dashboard until interrupted.
pub fn run_serve(addr: Option<&str>, open: bool) -> Result<()> {
    let cfg = config::load();
    let addr = addr.unwrap_or(&cfg.web.addr).to_string();
    let fetcher = DataFetcher::live(FetcherConfig::from_app_config(&cfg));

    if cfg.api.url.trim().is_empty() {
        activity::warn("api.url is not configured; pages will show an error until it is set");
    }

    web::serve(&addr, Dashboard::new(fetcher, &cfg.logging), open)
}

// ---------------------------------------------------------------------------
// pollen-gauge categories
// ---------------------------------------------------------------------------

/// List the category codes the sensor API is known to serve.
pub fn run_categories(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let value: Vec<_> = KNOWN_CATEGORIES
                .iter()
                .map(|c| serde_json::json!({ "code": c.code, "name": c.name }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Csv => {
            println!("code,name");
            for c in KNOWN_CATEGORIES {
                println!("{},{}", c.code, csv_field(c.name));
            }
        }
        OutputFormat::Table => {
            println!("{}", "Category Codes".bold().cyan());
            println!("{}", "=".repeat(40));
            for (i, c) in KNOWN_CATEGORIES.iter().enumerate() {
                let line = format!("  {:<10} {}", c.code, c.name);
                if i % 2 == 0 {
                    println!("{line}");
                } else {
                    println!("{}", line.dimmed());
                }
            }
            println!();
            println!(
                "  {}",
                format!("Default: {}", categories::DEFAULT_CATEGORY).dimmed()
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// pollen-gauge history
// ---------------------------------------------------------------------------

/// Show the most recent fetches from the activity log.
pub fn run_history(limit: usize, format: OutputFormat) -> Result<()> {
    let all = logger::read_all_entries();

    if all.is_empty() {
        println!(
            "{}",
            "No fetches logged yet. Run `pollen-gauge gauges` to record one.".yellow()
        );
        return Ok(());
    }

    let summary = activity::summarize(&all);
    let recent = logger::tail(all, limit);

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "total": summary.total,
                "live": summary.live,
                "cache": summary.cache,
                "errors": summary.errors,
                "avg_live_latency_ms": summary.avg_live_latency_ms,
                "entries": recent,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Csv => {
            println!("timestamp,surface,date,interval,categories,source,gauges,latency_ms,error");
            for e in &recent {
                println!(
                    "{},{},{},{},{},{},{},{},{}",
                    e.timestamp,
                    e.surface,
                    csv_field(&e.date),
                    e.interval,
                    csv_field(&e.categories.join(",")),
                    e.source,
                    e.gauges,
                    e.latency_ms.map(|ms| ms.to_string()).unwrap_or_default(),
                    csv_field(e.error.as_deref().unwrap_or("")),
                );
            }
        }
        OutputFormat::Table => {
            println!("{}", "Fetch History".bold().cyan());
            println!("{}", "=".repeat(60));
            println!();
            println!("  {} {}", "Total fetches:".bold(), summary.total);
            println!(
                "  {} {} live, {} cache ({:.0}% hit rate), {} errors",
                "Sources:      ".bold(),
                summary.live,
                summary.cache,
                summary.cache_hit_pct(),
                summary.errors,
            );
            if let Some(ms) = summary.avg_live_latency_ms {
                println!("  {} {ms} ms", "Avg live:     ".bold());
            }
            println!();

            println!(
                "  {:<19} {:<4} {:<10} {:<5} {:<16} {:<6} {:>6}",
                "Time", "Via", "Date", "Int", "Categories", "Source", "Gauges"
            );
            println!("  {}", "-".repeat(74));
            for e in &recent {
                println!(
                    "  {:<19} {:<4} {:<10} {:<5} {:<16} {} {:>6}",
                    truncate(&e.timestamp, 19),
                    e.surface,
                    truncate(&e.date, 10),
                    e.interval,
                    truncate(&e.categories.join(","), 16),
                    colorize_source(&e.source),
                    e.gauges,
                );
                if let Some(err) = &e.error {
                    println!("      {}", truncate(err, 70).red());
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// pollen-gauge cache show | clear
// ---------------------------------------------------------------------------

/// Describe the cached response, if any.
pub fn run_cache_show() -> Result<()> {
    let cfg = config::load();
    let store = FileCache::default_location().context("could not determine home directory")?;

    println!("{}", "Cache".bold().cyan());
    println!("{}", "=".repeat(50));
    println!("  {} {}", "Path:      ".bold(), store.path().display());

    let Some(entry) = store.read() else {
        println!("  {}", "(empty)".dimmed());
        return Ok(());
    };

    let now = Utc::now();
    let max_age = cache::max_age_from_ms(cfg.cache.max_age_ms);
    let fresh = cache::is_fresh(&entry, now, max_age);
    let age_min = (now - entry.fetched_at).num_minutes();

    println!(
        "  {} {} ({age_min} min ago)",
        "Fetched:   ".bold(),
        entry.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
    println!(
        "  {} {}",
        "Status:    ".bold(),
        if fresh { "fresh".green() } else { "stale".yellow() }
    );
    println!("  {} {}", "Date:      ".bold(), entry.request.date);
    println!("  {} {}", "Interval:  ".bold(), entry.request.interval);
    println!(
        "  {} {} ({} matched)",
        "Categories:".bold(),
        entry.request.categories.join(", "),
        entry.payload.matched(),
    );
    println!("  {} {}", "Moments:   ".bold(), entry.payload.moments.len());

    Ok(())
}

/// Drop the cached response so the next fetch goes to the API.
pub fn run_cache_clear() -> Result<()> {
    let mut store = FileCache::default_location().context("could not determine home directory")?;
    store.clear()?;
    println!(
        "{} Cache cleared at {}",
        "✓".green().bold(),
        store.path().display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// pollen-gauge config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective pollen-gauge Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.pollen-gauge/config.toml", global_exists);
    print_source(".pollen-gauge.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "POLLEN_GAUGE_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.pollen-gauge/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Set api.url and api.key before fetching.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    let shown = if key == "api.key" { "********" } else { value };
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), shown);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Quote a CSV field when it contains a separator or a quote.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Colorize a data source name, padded to the history column width.
fn colorize_source(source: &str) -> colored::ColoredString {
    let padded = format!("{source:<6}");
    match source {
        "live" => padded.green(),
        "cache" => padded.blue(),
        "error" => padded.red(),
        _ => padded.normal(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hell…");
        assert_eq!(truncate("ab", 2), "ab");
        assert_eq!(truncate("Bäume über", 4), "Bäu…");
    }

    #[test]
    fn test_csv_field() {
        assert_eq!(csv_field("POL"), "POL");
        assert_eq!(csv_field("POL,GRA"), "\"POL,GRA\"");
        assert_eq!(csv_field(r#"say "hi""#), r#""say ""hi""""#);
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_str_opt(Some("unknown")),
            OutputFormat::Table
        );
    }
}
