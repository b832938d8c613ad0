//! Storage contracts.
//!
//! Every backend has to enforce the same invariants the Postgres schema does:
//! usernames and link URLs are unique (a violation surfaces as
//! `AppError::Conflict`), a link has at most one analytics row, and deleting a
//! user or link removes everything hanging off it.

use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::db::models::{Analytics, Link, LinkPatch, NewUser, User, UserPatch};
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fails with `Conflict` if the username is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Returns `None` if no user has this id.
    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<Option<User>>;

    /// Returns whether a row was removed. Cascades to links and analytics.
    async fn delete_user(&self, id: i64) -> Result<bool>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Fails with `Conflict` if the URL is used by any link.
    async fn insert_link(&self, user_id: i64, title: String, url: String) -> Result<Link>;

    async fn url_exists(&self, url: &str) -> Result<bool>;

    async fn find_link(&self, id: i64) -> Result<Option<Link>>;

    /// Ownership-scoped update: `None` when no link `id` is owned by `user_id`.
    async fn update_owned_link(&self, id: i64, user_id: i64, patch: LinkPatch) -> Result<Option<Link>>;

    /// Ownership-scoped delete: `false` when no link `id` is owned by `user_id`.
    async fn delete_owned_link(&self, id: i64, user_id: i64) -> Result<bool>;

    /// Links owned by `user_id` in creation order.
    async fn links_for_user(&self, user_id: i64) -> Result<Vec<Link>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Atomically creates or bumps the analytics row for `link_id` and, when a
    /// visitor is given, adds it to the visitor set if absent. Concurrent calls
    /// never lose an increment. Fails with `NotFound` if the link is gone.
    ///
    /// The returned row carries the full visitor set, so its size grows with
    /// the number of distinct named visitors of the link.
    async fn record_click(&self, link_id: i64, visitor: Option<String>) -> Result<Analytics>;

    async fn analytics_for_link(&self, link_id: i64) -> Result<Option<Analytics>>;

    /// Analytics keyed by link id; links never clicked are absent.
    async fn analytics_for_links(&self, link_ids: Vec<i64>) -> Result<HashMap<i64, Analytics>>;
}

/// A backend providing all three stores.
pub trait Store: IdentityStore + LinkStore + AnalyticsStore {}

impl<T: IdentityStore + LinkStore + AnalyticsStore> Store for T {}
