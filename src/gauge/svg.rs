/// Semicircular SVG gauges for the dashboard page.
///
/// Each reading becomes one `<figure id="gauge-{slot}">` holding the gauge
/// face (one arc per zone), a needle at the misery percentage, and a caption
/// with the category label, reading time and PPM.
use std::f64::consts::PI;
use std::fmt::Write as _;

use anyhow::Result;

use super::{GAUGE_MAX, GaugeSink, ZONES, clamp_value, zone_for};
use super::terminal::format_ppm;
use crate::model::GaugeReading;

const CENTER_X: f64 = 100.0;
const CENTER_Y: f64 = 100.0;
const RADIUS: f64 = 80.0;
const NEEDLE: f64 = 68.0;

/// Collects one HTML figure per drawn gauge.
#[derive(Debug, Default)]
pub struct SvgGauge {
    figures: Vec<String>,
}

impl SvgGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn figures(&self) -> &[String] {
        &self.figures
    }

    pub fn into_html(self) -> String {
        self.figures.join("\n")
    }
}

impl GaugeSink for SvgGauge {
    fn draw(&mut self, reading: &GaugeReading) -> Result<()> {
        let mut html = String::new();
        writeln!(
            html,
            r#"<figure class="gauge" id="gauge-{}" data-code="{}">"#,
            reading.slot,
            escape_html(&reading.code)
        )?;
        html.push_str(&gauge_svg(reading.misery.value()));
        writeln!(
            html,
            r#"<figcaption><strong>{}</strong><span class="time">{}</span><span class="ppm">PPM: {}</span></figcaption>"#,
            escape_html(&reading.category_label),
            escape_html(&reading.time_label),
            format_ppm(reading.ppm),
        )?;
        html.push_str("</figure>");
        self.figures.push(html);
        Ok(())
    }
}

/// Point on the gauge arc for a 0–100 value.
fn point(value: f64, radius: f64) -> (f64, f64) {
    let angle = PI * (1.0 - clamp_value(value) / GAUGE_MAX);
    (CENTER_X + radius * angle.cos(), CENTER_Y - radius * angle.sin())
}

fn arc(from: f64, to: f64, color: &str) -> String {
    let (x0, y0) = point(from, RADIUS);
    let (x1, y1) = point(to, RADIUS);
    format!(
        r#"<path d="M {x0:.2} {y0:.2} A {RADIUS} {RADIUS} 0 0 1 {x1:.2} {y1:.2}" stroke="{color}" stroke-width="18" fill="none"/>"#
    )
}

/// The gauge face. `None` draws the face without a needle.
fn gauge_svg(value: Option<f64>) -> String {
    let mut svg = String::from(
        r#"<svg viewBox="0 0 200 120" width="220" role="img" xmlns="http://www.w3.org/2000/svg">"#,
    );
    svg.push('\n');

    for (i, band) in ZONES.iter().enumerate() {
        let to = ZONES.get(i + 1).map(|next| next.from).unwrap_or(band.to);
        svg.push_str(&arc(band.from, to, band.zone.color()));
        svg.push('\n');
    }

    match value {
        Some(v) => {
            let (x, y) = point(v, NEEDLE);
            let zone = zone_for(v);
            svg.push_str(&format!(
                r##"<line x1="{CENTER_X}" y1="{CENTER_Y}" x2="{x:.2}" y2="{y:.2}" stroke="#e6edf3" stroke-width="3"/>"##
            ));
            svg.push_str(&format!(
                r#"<text x="100" y="116" text-anchor="middle" class="value" fill="{}">{v:.2}% {}</text>"#,
                zone.color(),
                zone.label()
            ));
        }
        None => {
            svg.push_str(r#"<text x="100" y="116" text-anchor="middle" class="value">unavailable</text>"#);
        }
    }

    svg.push_str("\n</svg>\n");
    svg
}

/// Minimal escaping for text and attribute content.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
