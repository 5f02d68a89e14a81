//! Embedded gauge dashboard.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - `GET /`: the gauge page, one SVG gauge per category
//! - `GET /api/readings`: the same readings as JSON
//! - `GET /api/health`: configuration and cache status
//!
//! The page and `/api/readings` accept the query parameters `date`
//! (`YYYY-MM-DD`), `categoryCodes` (comma separated), `interval`
//! (`hour`|`day`) and `noCache` (`true` bypasses the cache).
//!
//! Launched via `pollen-gauge serve` (default: `http://127.0.0.1:9747`).

mod api;
mod page;

use std::io::Cursor;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::activity::{self, logger::FetchLogEntry};
use crate::categories::{parse_category_codes, unknown_codes};
use crate::config::{is_truthy, schema::LoggingConfig};
use crate::dates;
use crate::fetcher::{DataFetcher, FetchOutcome, FetchRequest};
use crate::gauge::{SvgGauge, render_all};
use crate::model::{GaugeReading, Interval};
use crate::series::build_readings;

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server on the given address.
///
/// Blocks the current thread. Handles requests sequentially (one page load
/// is one fetch). Errors are answered per request without stopping the
/// server.
pub fn serve(addr: &str, mut dashboard: Dashboard, open: bool) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("pollen-gauge dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    if open {
        let _ = open_browser(&format!("http://{addr}"));
    }

    for request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let reply = match dashboard.dispatch(&method, &url) {
            Ok(reply) => reply,
            Err(e) => Reply::error_json(500, &format!("{e:#}")),
        };
        let status = reply.status;
        let _ = request.respond(reply.into_response());

        // Brief access log
        println!(
            "{} {} {} {}",
            method,
            url,
            status,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// Request handler state: the fetcher (and with it the cache slot) shared
/// by every page load.
pub struct Dashboard {
    fetcher: DataFetcher,
    log_enabled: bool,
    verbose: bool,
}

impl Dashboard {
    pub fn new(fetcher: DataFetcher, logging: &LoggingConfig) -> Self {
        Self {
            fetcher,
            log_enabled: logging.enabled,
            verbose: logging.verbose,
        }
    }

    /// Route a request to its handler.
    pub fn dispatch(&mut self, method: &Method, url: &str) -> Result<Reply> {
        // Strip query string for path matching
        let path = url.split('?').next().unwrap_or(url);

        match (method, path) {
            (&Method::Get, "/") | (&Method::Get, "/index.html") => self.gauge_page(url),
            (&Method::Get, "/api/readings") => api::get_readings(self, url),
            (&Method::Get, "/api/health") => api::get_health(self),
            _ => Ok(Reply::error_json(404, "not found")),
        }
    }

    fn gauge_page(&mut self, url: &str) -> Result<Reply> {
        let query = PageQuery::from_url(url);
        match self.fetch(&query) {
            Ok(fetched) => {
                let mut sink = SvgGauge::new();
                render_all(&mut sink, &fetched.readings)?;
                Ok(Reply::html(200, page::render_gauges(&query, &fetched, &sink.into_html())))
            }
            Err(failure) => Ok(Reply::html(
                failure.status,
                page::render_error(&query, failure.status, &failure.message),
            )),
        }
    }

    /// Run one fetch for the page parameters, logging the outcome.
    fn fetch(&mut self, query: &PageQuery) -> std::result::Result<Fetched, Failure> {
        let config = self.fetcher.config();
        let codes = parse_category_codes(query.category_codes.as_deref(), &config.default_categories);
        let interval_label = query
            .interval
            .clone()
            .unwrap_or_else(|| config.default_interval.to_string());
        let zone = config.timezone;

        match self.checked_request(query, &codes) {
            Ok(request) => {
                let started = Instant::now();
                match self.fetcher.fetch_category_data(&request) {
                    Ok(outcome) => {
                        let latency_ms = started.elapsed().as_millis() as u64;
                        if let Some(warning) = &outcome.cache_warning {
                            activity::warn(&format!("could not write cache: {warning}"));
                        }
                        activity::debug(
                            self.verbose,
                            &format!(
                                "{} fetch for {} ({} .. {})",
                                outcome.source,
                                outcome.date,
                                dates::format_api_timestamp(outcome.window.start),
                                dates::format_api_timestamp(outcome.window.end),
                            ),
                        );

                        let readings = build_readings(&outcome.data, zone);
                        self.log(FetchLogEntry::success("web", &codes, &outcome, readings.len(), latency_ms));
                        Ok(Fetched {
                            unknown: unknown_codes(&codes).into_iter().map(String::from).collect(),
                            codes,
                            outcome,
                            readings,
                        })
                    }
                    Err(e) => {
                        self.log(FetchLogEntry::failure("web", query.date.as_deref(), &interval_label, &codes, &e));
                        Err(Failure {
                            status: 502,
                            message: format!("{e:#}"),
                        })
                    }
                }
            }
            Err(e) => {
                self.log(FetchLogEntry::failure("web", query.date.as_deref(), &interval_label, &codes, &e));
                Err(Failure {
                    status: 400,
                    message: format!("{e:#}"),
                })
            }
        }
    }

    /// Validate the caller-supplied parameters before any fetch is attempted.
    fn checked_request(&self, query: &PageQuery, codes: &[String]) -> Result<FetchRequest> {
        let mut request = FetchRequest::new(codes.to_vec());

        if let Some(raw) = query.interval.as_deref()
            && !raw.trim().is_empty()
        {
            let interval = Interval::parse(raw)
                .with_context(|| format!("invalid interval '{raw}', expected hour or day"))?;
            request = request.with_interval(interval);
        }

        if let Some(raw) = query.date.as_deref()
            && !raw.trim().is_empty()
        {
            dates::resolve_requested_date(Some(raw), chrono::Local::now().date_naive())?;
            request = request.with_date(raw);
        }

        if query.no_cache {
            request = request.bypass_cache();
        }
        Ok(request)
    }

    fn log(&self, entry: FetchLogEntry) {
        if self.log_enabled {
            activity::logger::log_fetch(&entry);
        }
    }
}

/// A successful page fetch.
struct Fetched {
    codes: Vec<String>,
    unknown: Vec<String>,
    outcome: FetchOutcome,
    readings: Vec<GaugeReading>,
}

/// A failed page fetch and the status it maps to.
struct Failure {
    status: u16,
    message: String,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Dashboard query parameters, decoded but not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub date: Option<String>,
    pub category_codes: Option<String>,
    pub interval: Option<String>,
    pub no_cache: bool,
}

impl PageQuery {
    pub fn from_url(url: &str) -> Self {
        let mut query = Self::default();
        let Some(qs) = url.split_once('?').map(|(_, qs)| qs) else {
            return query;
        };

        for pair in qs.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = percent_decode(value);
            match key {
                "date" => query.date = Some(value),
                "categoryCodes" => query.category_codes = Some(value),
                "interval" => query.interval = Some(value),
                "noCache" => query.no_cache = is_truthy(&value),
                _ => {}
            }
        }
        query
    }
}

/// Decode `%XX` escapes and `+` in a query value. Invalid escapes are kept
/// literally.
fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let decoded = Some(&bytes[i + 1..i + 3])
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match decoded {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// A rendered response, kept independent of `tiny_http` until it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    fn json<T: Serialize>(status: u16, data: &T) -> Result<Self> {
        let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
        Ok(Self {
            status,
            content_type: "application/json; charset=utf-8",
            body,
        })
    }

    fn error_json(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json; charset=utf-8",
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let mut resp = Response::from_data(self.body.into_bytes())
            .with_status_code(StatusCode(self.status));
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], self.content_type.as_bytes()) {
            resp = resp.with_header(header);
        }
        resp
    }
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}
