//! Identity management: signup, login, public profiles and account changes.

pub mod handlers;
mod service;

pub use service::{ProfileUpdate, UserService};
pub(crate) use service::non_empty;
