/// Latest-reading selection over sparse, null-padded series.
///
/// The API pads each category's series with `null` wherever the sensor had
/// no reading, typically at the tail of the current day. Selection is driven
/// by PPM validity only: the misery value is taken from the same index, and
/// a misery value at some other index is never used.
use crate::dates::{self, DisplayZone};
use crate::model::{CategoryData, CategorySeries, GaugeReading, MiseryPercent};

/// The latest valid data point of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestReading {
    pub index: usize,
    pub ppm: f64,
    pub misery: MiseryPercent,
    /// Moment at `index`, if the moments sequence is long enough.
    pub moment: Option<String>,
}

/// Scan `series` backwards for the last present PPM value.
///
/// Returns `None` when every PPM value is absent; the caller skips the
/// category.
pub fn latest_valid(series: &CategorySeries, moments: &[String]) -> Option<LatestReading> {
    let (index, ppm) = series
        .ppm_values
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, v)| v.map(|ppm| (i, ppm)))?;

    let misery = series
        .misery_values
        .as_ref()
        .and_then(|values| values.get(index).copied().flatten())
        .map(|m| MiseryPercent::Percent(to_percent(m)))
        .unwrap_or(MiseryPercent::Unavailable);

    Some(LatestReading {
        index,
        ppm,
        misery,
        moment: moments.get(index).cloned(),
    })
}

/// 0–1 misery index to a percentage rounded to two decimals.
///
/// Ties round away from zero. Misery is never negative, so this matches
/// round-half-up on every value the API sends.
fn to_percent(misery: f64) -> f64 {
    (misery * 100.0 * 100.0).round() / 100.0
}

/// Build one gauge reading per requested category that has data, in request
/// order. Unmatched categories and categories without a valid point are
/// skipped.
pub fn build_readings(data: &CategoryData, zone: DisplayZone) -> Vec<GaugeReading> {
    data.categories
        .iter()
        .enumerate()
        .filter_map(|(slot, series)| {
            let series = series.as_ref()?;
            let latest = latest_valid(series, &data.moments)?;
            let time_label = latest
                .moment
                .as_deref()
                .map(|m| dates::moment_label(m, zone))
                .unwrap_or_else(|| "unknown time".to_string());

            Some(GaugeReading {
                slot,
                code: series.code.clone(),
                category_label: series.description.clone(),
                moment: latest.moment,
                time_label,
                ppm: latest.ppm,
                misery: latest.misery,
            })
        })
        .collect()
}
