use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::db::models::{Analytics, Link, LinkPatch, NewUser, User, UserPatch};
use crate::db::store::{AnalyticsStore, IdentityStore, LinkStore};
use crate::error::AppError;
use crate::Result;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    links: BTreeMap<i64, Link>,
    // keyed by link id: at most one row per link
    analytics: BTreeMap<i64, Analytics>,
    next_user_id: i64,
    next_link_id: i64,
    next_analytics_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn url_taken(&self, url: &str, except: Option<i64>) -> bool {
        self.links
            .values()
            .any(|link| link.url == url && Some(link.id) != except)
    }

    fn remove_link(&mut self, id: i64) {
        self.links.remove(&id);
        self.analytics.remove(&id);
    }
}

/// In-process backend with the same constraints as the Postgres schema.
///
/// All writes go through one lock, so each operation is atomic with respect
/// to every other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("username already exists".into()));
        }

        let now = Utc::now();
        let id = Tables::next_id(&mut tables.next_user_id);
        let user = User {
            id,
            full_name: user.full_name,
            username: user.username,
            bio: user.bio,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(full_name) = patch.full_name {
            user.full_name = full_name;
        }
        if let Some(bio) = patch.bio {
            user.bio = bio;
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        let owned: Vec<i64> = tables
            .links
            .values()
            .filter(|link| link.user_id == id)
            .map(|link| link.id)
            .collect();
        for link_id in owned {
            tables.remove_link(link_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn insert_link(&self, user_id: i64, title: String, url: String) -> Result<Link> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(AppError::NotFound("user not found".into()));
        }
        if tables.url_taken(&url, None) {
            return Err(AppError::Conflict("link already exists".into()));
        }

        let now = Utc::now();
        let id = Tables::next_id(&mut tables.next_link_id);
        let link = Link {
            id,
            title,
            url,
            user_id,
            created_at: now,
            updated_at: now,
        };
        tables.links.insert(id, link.clone());
        Ok(link)
    }

    async fn url_exists(&self, url: &str) -> Result<bool> {
        Ok(self.tables.read().await.url_taken(url, None))
    }

    async fn find_link(&self, id: i64) -> Result<Option<Link>> {
        Ok(self.tables.read().await.links.get(&id).cloned())
    }

    async fn update_owned_link(&self, id: i64, user_id: i64, patch: LinkPatch) -> Result<Option<Link>> {
        let mut tables = self.tables.write().await;
        if !matches!(tables.links.get(&id), Some(link) if link.user_id == user_id) {
            return Ok(None);
        }
        if let Some(url) = &patch.url {
            if tables.url_taken(url, Some(id)) {
                return Err(AppError::Conflict("link already exists".into()));
            }
        }

        let Some(link) = tables.links.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            link.title = title;
        }
        if let Some(url) = patch.url {
            link.url = url;
        }
        link.updated_at = Utc::now();
        Ok(Some(link.clone()))
    }

    async fn delete_owned_link(&self, id: i64, user_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let owned = matches!(tables.links.get(&id), Some(link) if link.user_id == user_id);
        if owned {
            tables.remove_link(id);
        }
        Ok(owned)
    }

    async fn links_for_user(&self, user_id: i64) -> Result<Vec<Link>> {
        let tables = self.tables.read().await;
        Ok(tables
            .links
            .values()
            .filter(|link| link.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn record_click(&self, link_id: i64, visitor: Option<String>) -> Result<Analytics> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;
        if !tables.links.contains_key(&link_id) {
            return Err(AppError::NotFound("link not found".into()));
        }

        let now = Utc::now();
        let analytics = match tables.analytics.entry(link_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Analytics {
                id: Tables::next_id(&mut tables.next_analytics_id),
                link_id,
                click_count: 0,
                visitors: Vec::new(),
                created_at: now,
                updated_at: now,
            }),
        };

        analytics.click_count += 1;
        analytics.updated_at = now;
        if let Some(username) = visitor {
            if !analytics.visitors.contains(&username) {
                analytics.visitors.push(username);
            }
        }
        Ok(analytics.clone())
    }

    async fn analytics_for_link(&self, link_id: i64) -> Result<Option<Analytics>> {
        Ok(self.tables.read().await.analytics.get(&link_id).cloned())
    }

    async fn analytics_for_links(&self, link_ids: Vec<i64>) -> Result<HashMap<i64, Analytics>> {
        let tables = self.tables.read().await;
        Ok(link_ids
            .into_iter()
            .filter_map(|id| tables.analytics.get(&id).map(|a| (id, a.clone())))
            .collect())
    }
}
