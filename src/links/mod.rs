//! Owner-scoped link management.

pub mod handlers;
mod service;

pub use service::{validate_url, LinkService};
