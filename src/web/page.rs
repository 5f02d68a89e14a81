//! HTML pages for the dashboard.
//!
//! Pages are rendered server-side: a parameter form, a header with the
//! human-readable date and data source, and the gauge figures produced by
//! the SVG sink. No client-side script.

use std::fmt::Write as _;

use crate::dates;
use crate::gauge::svg::escape_html;

use super::{Fetched, PageQuery};

const STYLE: &str = r#"
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --red: #f85149;
  --yellow: #d29922;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
}

* { margin: 0; padding: 0; box-sizing: border-box; }

body {
  font-family: var(--font);
  background: var(--bg);
  color: var(--text);
  padding: 24px;
}

header h1 { font-size: 20px; font-weight: 600; }
header p { color: var(--text-muted); margin-top: 4px; font-size: 14px; }

form {
  display: flex;
  flex-wrap: wrap;
  gap: 12px;
  align-items: end;
  margin: 20px 0;
  padding: 16px;
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
}

label { display: flex; flex-direction: column; font-size: 12px; color: var(--text-muted); gap: 4px; }
label.inline { flex-direction: row; align-items: center; }

input, select, button {
  background: var(--bg);
  color: var(--text);
  border: 1px solid var(--border);
  border-radius: 6px;
  padding: 6px 10px;
  font-size: 14px;
}

button { background: var(--accent); border-color: var(--accent); color: #fff; cursor: pointer; }

.gauges {
  display: grid;
  grid-template-columns: repeat(auto-fill, minmax(240px, 1fr));
  gap: 16px;
}

figure.gauge {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 16px;
  text-align: center;
}

figure.gauge text.value { font-size: 12px; fill: var(--text); }
figcaption { display: flex; flex-direction: column; gap: 2px; font-size: 13px; }
figcaption .time, figcaption .ppm { color: var(--text-muted); }

.notice, .error {
  padding: 12px 16px;
  border-radius: var(--radius);
  margin-bottom: 16px;
  border: 1px solid var(--border);
}

.notice { color: var(--yellow); }
.error { color: var(--red); }
"#;

/// Page with the gauges for a successful fetch.
pub(super) fn render_gauges(query: &PageQuery, fetched: &Fetched, figures: &str) -> String {
    let outcome = &fetched.outcome;
    let mut body = String::new();

    let _ = write!(
        body,
        "<header><h1>{}</h1><p>{} interval &middot; {} &middot; {} data fetched {}</p></header>",
        escape_html(&dates::to_human_label(outcome.date)),
        outcome.interval,
        escape_html(&fetched.codes.join(", ")),
        outcome.source,
        outcome.fetched_at.format("%Y-%m-%d %H:%M UTC"),
    );
    body.push_str(&render_form(query));

    if !fetched.unknown.is_empty() {
        let _ = write!(
            body,
            r#"<p class="notice">Unknown category codes (requested anyway): {}</p>"#,
            escape_html(&fetched.unknown.join(", "))
        );
    }

    if fetched.readings.is_empty() {
        body.push_str(r#"<p class="notice">No readings available for the requested categories.</p>"#);
    } else {
        let _ = write!(body, r#"<section class="gauges">{figures}</section>"#);
    }

    layout(&dates::to_human_label(outcome.date), &body)
}

/// Page for a request that could not be served.
pub(super) fn render_error(query: &PageQuery, status: u16, message: &str) -> String {
    let heading = if status == 400 {
        "Invalid request"
    } else {
        "Could not load sensor data"
    };

    let mut body = String::new();
    let _ = write!(body, "<header><h1>{heading}</h1></header>");
    body.push_str(&render_form(query));
    let _ = write!(body, r#"<p class="error">{}</p>"#, escape_html(message));

    layout(heading, &body)
}

fn render_form(query: &PageQuery) -> String {
    let interval = query.interval.as_deref().unwrap_or("");
    let option = |value: &str, label: &str| {
        let selected = if interval == value { " selected" } else { "" };
        format!(r#"<option value="{value}"{selected}>{label}</option>"#)
    };

    format!(
        concat!(
            r#"<form method="get" action="/">"#,
            r#"<label>Date<input type="date" name="date" value="{date}"></label>"#,
            r#"<label>Categories<input type="text" name="categoryCodes" value="{codes}" placeholder="POL,GRA"></label>"#,
            r#"<label>Interval<select name="interval">{default}{hour}{day}</select></label>"#,
            r#"<label class="inline"><input type="checkbox" name="noCache" value="true"{no_cache}> Skip cache</label>"#,
            r#"<button type="submit">Show</button>"#,
            "</form>"
        ),
        date = escape_html(query.date.as_deref().unwrap_or("")),
        codes = escape_html(query.category_codes.as_deref().unwrap_or("")),
        default = option("", "default"),
        hour = option("hour", "hour"),
        day = option("day", "day"),
        no_cache = if query.no_cache { " checked" } else { "" },
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} &middot; pollen-gauge</title>\n<style>{STYLE}</style>\n</head>\n\
         <body>\n{body}\n</body>\n</html>\n",
        escape_html(title)
    )
}
