/// Sensor API contract.
///
/// The vendor API is an external collaborator: this module only describes
/// the request/response shapes and the projection of a response onto the
/// requested category codes. The live HTTP implementation is
/// [`client::SensorApiClient`]; tests substitute their own [`SensorSource`].
///
/// Response shape:
///
/// ```json
/// {
///   "Moments": ["2024-09-12T00:00:00Z", "..."],
///   "Categories": [
///     { "CategoryCode": "POL", "CategoryDescription": "Pollen",
///       "PPM3": [1.0, null], "Misery": [0.12, null] }
///   ]
/// }
/// ```
use std::rc::Rc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::{CategoryData, CategorySeries, Interval, TimeWindow};

pub mod client;

pub use client::SensorApiClient;

/// Header carrying the static API key.
pub const API_KEY_HEADER: &str = "X-Ps-Key";

/// Anything that can answer a windowed sensor query.
pub trait SensorSource {
    fn fetch(&self, interval: Interval, window: &TimeWindow) -> Result<ApiResponse>;
}

impl<T: SensorSource + ?Sized> SensorSource for Box<T> {
    fn fetch(&self, interval: Interval, window: &TimeWindow) -> Result<ApiResponse> {
        (**self).fetch(interval, window)
    }
}

impl<T: SensorSource + ?Sized> SensorSource for Rc<T> {
    fn fetch(&self, interval: Interval, window: &TimeWindow) -> Result<ApiResponse> {
        (**self).fetch(interval, window)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Response body of the sensor endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "Moments")]
    pub moments: Vec<String>,
    #[serde(rename = "Categories")]
    pub categories: Vec<ApiCategory>,
}

/// One category entry in the response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCategory {
    #[serde(rename = "CategoryCode")]
    pub code: String,
    #[serde(rename = "CategoryDescription", default)]
    pub description: String,
    #[serde(rename = "PPM3", default)]
    pub ppm3: Vec<Option<f64>>,
    #[serde(rename = "Misery", default, skip_serializing_if = "Option::is_none")]
    pub misery: Option<Vec<Option<f64>>>,
}

impl From<ApiCategory> for CategorySeries {
    fn from(c: ApiCategory) -> Self {
        Self {
            code: c.code,
            description: c.description,
            ppm_values: c.ppm3,
            misery_values: c.misery,
        }
    }
}

impl ApiResponse {
    /// Keep the moments and pick one series per requested code, in request
    /// order. Codes without a matching entry become `None`.
    pub fn project(self, codes: &[String]) -> CategoryData {
        let ApiResponse {
            moments,
            categories,
        } = self;

        let projected = codes
            .iter()
            .map(|code| {
                categories
                    .iter()
                    .find(|c| &c.code == code)
                    .cloned()
                    .map(CategorySeries::from)
            })
            .collect();

        CategoryData {
            moments,
            categories: projected,
        }
    }
}
