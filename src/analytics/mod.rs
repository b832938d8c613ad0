//! Per-link click analytics.

pub mod handlers;
mod service;

pub use service::AnalyticsService;
