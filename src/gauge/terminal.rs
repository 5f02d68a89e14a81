/// Text gauges for the CLI.
///
/// Each gauge is three lines: the category heading with the reading time, a
/// horizontal bar colored by zone, and the raw PPM value.
use std::io::Write;

use anyhow::Result;
use colored::{ColoredString, Colorize};

use super::{GaugeSink, Zone, clamp_value, zone_for};
use crate::model::GaugeReading;

const DEFAULT_WIDTH: usize = 30;

pub struct TerminalGauge<W: Write> {
    out: W,
    width: usize,
}

impl<W: Write> TerminalGauge<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            width: DEFAULT_WIDTH,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> GaugeSink for TerminalGauge<W> {
    fn draw(&mut self, reading: &GaugeReading) -> Result<()> {
        writeln!(
            self.out,
            "  {} {}  {}",
            reading.category_label.bold(),
            format!("({})", reading.code).dimmed(),
            reading.time_label.dimmed(),
        )?;

        match reading.misery.value() {
            Some(value) => {
                let zone = zone_for(value);
                writeln!(
                    self.out,
                    "  [{}] {:>7}  {}",
                    paint(&bar(value, self.width), zone),
                    format!("{value:.2}%"),
                    paint(zone.label(), zone),
                )?;
            }
            None => {
                writeln!(
                    self.out,
                    "  [{}] {:>7}",
                    bar(0.0, self.width).dimmed(),
                    "unavailable".yellow(),
                )?;
            }
        }

        writeln!(self.out, "  {} {}", "PPM:".dimmed(), format_ppm(reading.ppm))?;
        writeln!(self.out)?;
        Ok(())
    }
}

/// Filled/empty bar proportional to `value` on the 0–100 scale.
fn bar(value: f64, width: usize) -> String {
    let filled = ((clamp_value(value) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn paint(text: &str, zone: Zone) -> ColoredString {
    match zone {
        Zone::Low => text.green(),
        Zone::Moderate => text.yellow(),
        Zone::High => text.bright_red(),
        Zone::VeryHigh => text.red().bold(),
    }
}

/// Whole numbers without decimals, otherwise up to two decimals.
pub(crate) fn format_ppm(ppm: f64) -> String {
    if ppm.fract() == 0.0 {
        format!("{ppm:.0}")
    } else {
        let s = format!("{ppm:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gauge::render_all;
    use crate::model::MiseryPercent;

    fn reading(misery: MiseryPercent) -> GaugeReading {
        GaugeReading {
            slot: 0,
            code: "GRA".to_string(),
            category_label: "Grass".to_string(),
            moment: Some("2024-09-12T15:00:00Z".to_string()),
            time_label: "3:00 PM".to_string(),
            ppm: 41.5,
            misery,
        }
    }

    #[test]
    fn bar_proportions() {
        assert_eq!(bar(0.0, 10), "░░░░░░░░░░");
        assert_eq!(bar(50.0, 10), "█████░░░░░");
        assert_eq!(bar(100.0, 10), "██████████");
        assert_eq!(bar(140.0, 4), "████");
    }

    #[test]
    fn ppm_formatting() {
        assert_eq!(format_ppm(12.0), "12");
        assert_eq!(format_ppm(41.5), "41.5");
        assert_eq!(format_ppm(0.126), "0.13");
        assert_eq!(format_ppm(3.001), "3");
    }

    #[test]
    fn draws_heading_value_and_ppm() {
        let mut sink = TerminalGauge::new(Vec::new()).with_width(10);
        let drawn = render_all(&mut sink, &[reading(MiseryPercent::Percent(34.12))]).unwrap();
        assert_eq!(drawn, 1);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains("Grass"));
        assert!(text.contains("3:00 PM"));
        assert!(text.contains("34.12%"));
        assert!(text.contains("moderate"));
        assert!(text.contains("41.5"));
    }

    #[test]
    fn unavailable_misery_draws_empty_gauge() {
        let mut sink = TerminalGauge::new(Vec::new());
        sink.draw(&reading(MiseryPercent::Unavailable)).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains("unavailable"));
        assert!(!text.contains('█'));
    }
}
