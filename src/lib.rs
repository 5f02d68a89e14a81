//! pollen-gauge: fetch particulate and pollen readings from a sensor API and
//! draw one gauge per category.
//!
//! The flow for one invocation (CLI run or dashboard page load) is
//! [`fetcher::DataFetcher::fetch_category_data`] → [`series::build_readings`]
//! → [`gauge::render_all`] into a [`gauge::GaugeSink`].

pub mod activity;
pub mod api;
pub mod cache;
pub mod categories;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dates;
pub mod fetcher;
pub mod gauge;
pub mod model;
pub mod series;
pub mod web;
