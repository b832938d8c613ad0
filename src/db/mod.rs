//! Database module for the link page server
//!
//! Record types, the storage traits the services depend on, and the two
//! backends: Postgres for deployments and an in-memory store for tests and
//! local runs.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use models::{Analytics, Link, LinkPatch, LinkWithAnalytics, NewUser, Profile, User, UserPatch};
pub use postgres::PgStore;
pub use store::{AnalyticsStore, IdentityStore, LinkStore, Store};
