//! Toggl Track API integration for the exporter.
//!
//! Provides:
//! - An authenticated HTTP client behind the [`TogglApi`] trait
//! - A fetch boundary that turns every failure into `None` and counts it
//! - Typed fetchers for identity, timers, entries and workspace objects

mod client;
mod fetch;

pub use client::{ApiError, Client, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, TogglApi};
pub use fetch::{Fetcher, endpoint_label};
pub use reqwest::Method;
