/// Gauge rendering contract.
///
/// A gauge consumes a single 0–100 value, the misery percentage, and the
/// static zone configuration below. PPM and the time label are drawn next
/// to the gauge as text and never drive the needle.
///
/// | Zone      | Range    |
/// |-----------|----------|
/// | low       | 0–24     |
/// | moderate  | 25–49    |
/// | high      | 50–74    |
/// | very-high | 75–100   |
use std::fmt;

use anyhow::Result;

use crate::model::GaugeReading;

pub mod svg;
pub mod terminal;

pub use svg::SvgGauge;
pub use terminal::TerminalGauge;

pub const GAUGE_MIN: f64 = 0.0;
pub const GAUGE_MAX: f64 = 100.0;

/// Severity band of a gauge value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl Zone {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::VeryHigh => "very-high",
        }
    }

    /// Hex color used by the SVG gauge.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "#3fb950",
            Self::Moderate => "#d29922",
            Self::High => "#f0883e",
            Self::VeryHigh => "#f85149",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One band of the gauge face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneBand {
    pub zone: Zone,
    pub from: f64,
    pub to: f64,
}

pub const ZONES: [ZoneBand; 4] = [
    ZoneBand { zone: Zone::Low, from: 0.0, to: 24.0 },
    ZoneBand { zone: Zone::Moderate, from: 25.0, to: 49.0 },
    ZoneBand { zone: Zone::High, from: 50.0, to: 74.0 },
    ZoneBand { zone: Zone::VeryHigh, from: 75.0, to: 100.0 },
];

/// Clamp a value onto the gauge scale.
pub fn clamp_value(value: f64) -> f64 {
    if value.is_nan() {
        GAUGE_MIN
    } else {
        value.clamp(GAUGE_MIN, GAUGE_MAX)
    }
}

/// Zone for a gauge value. Fractional values between two bands (24.5) belong
/// to the lower band.
pub fn zone_for(value: f64) -> Zone {
    let value = clamp_value(value);
    ZONES
        .iter()
        .rev()
        .find(|band| value >= band.from)
        .map(|band| band.zone)
        .unwrap_or(Zone::Low)
}

/// A surface that can draw gauges.
pub trait GaugeSink {
    fn draw(&mut self, reading: &GaugeReading) -> Result<()>;
}

/// Draw every reading in order. Returns the number of gauges drawn.
pub fn render_all(sink: &mut dyn GaugeSink, readings: &[GaugeReading]) -> Result<usize> {
    for reading in readings {
        sink.draw(reading)?;
    }
    Ok(readings.len())
}
