use std::sync::Arc;

use tracing::debug;

use crate::auth::ANONYMOUS;
use crate::db::{Analytics, AnalyticsStore, LinkStore};
use crate::error::AppError;
use crate::Result;

/// Click counting with deduplicated visitor sets.
pub struct AnalyticsService {
    links: Arc<dyn LinkStore>,
    analytics: Arc<dyn AnalyticsStore>,
}

impl AnalyticsService {
    pub fn new(links: Arc<dyn LinkStore>, analytics: Arc<dyn AnalyticsStore>) -> Self {
        Self { links, analytics }
    }

    /// Counts one click on `link_id`. An empty or anonymous visitor still
    /// counts but is never added to the visitor set.
    pub async fn record_click(&self, link_id: i64, visitor: &str) -> Result<Analytics> {
        if self.links.find_link(link_id).await?.is_none() {
            return Err(AppError::NotFound("link not found".into()));
        }

        let visitor = match visitor {
            "" | ANONYMOUS => None,
            named => Some(named.to_string()),
        };
        let analytics = self.analytics.record_click(link_id, visitor).await?;

        debug!("Link {} now at {} clicks", link_id, analytics.click_count);
        Ok(analytics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{MockAnalyticsStore, MockLinkStore};
    use crate::db::{IdentityStore, Link, MemoryStore, NewUser};
    use mockall::predicate::eq;

    async fn setup() -> (AnalyticsService, i64) {
        let store = Arc::new(MemoryStore::new());
        let owner = store
            .insert_user(NewUser {
                full_name: "Alice".into(),
                username: "alice".into(),
                bio: String::new(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        let link = store
            .insert_link(owner.id, "Site".into(), "https://a.example".into())
            .await
            .unwrap();
        (AnalyticsService::new(store.clone(), store), link.id)
    }

    fn link(id: i64) -> Link {
        let now = chrono::Utc::now();
        Link {
            id,
            title: "Site".into(),
            url: "https://a.example".into(),
            user_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_first_click() {
        let (analytics, link_id) = setup().await;
        let row = analytics.record_click(link_id, "bob").await.unwrap();
        assert_eq!(row.link_id, link_id);
        assert_eq!(row.click_count, 1);
        assert_eq!(row.visitors, vec!["bob".to_string()]);
    }

    #[tokio::test]
    async fn test_repeat_visitor_counted_once() {
        let (analytics, link_id) = setup().await;
        let mut last = None;
        for _ in 0..5 {
            last = Some(analytics.record_click(link_id, "bob").await.unwrap());
        }
        let row = last.unwrap();
        assert_eq!(row.click_count, 5);
        assert_eq!(row.visitors.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_visitors() {
        let (analytics, link_id) = setup().await;
        for name in ["a", "b", "c", "d"] {
            analytics.record_click(link_id, name).await.unwrap();
        }
        let row = analytics.record_click(link_id, "e").await.unwrap();
        assert_eq!(row.click_count, 5);
        assert_eq!(row.visitors.len(), 5);
    }

    #[tokio::test]
    async fn test_anonymous_clicks_do_not_populate_visitors() {
        let (analytics, link_id) = setup().await;
        analytics.record_click(link_id, ANONYMOUS).await.unwrap();
        let row = analytics.record_click(link_id, "").await.unwrap();
        assert_eq!(row.click_count, 2);
        assert!(row.visitors.is_empty());
    }

    #[tokio::test]
    async fn test_missing_link_never_touches_analytics() {
        let mut links = MockLinkStore::new();
        links.expect_find_link().with(eq(7)).returning(|_| Ok(None));
        let mut store = MockAnalyticsStore::new();
        store.expect_record_click().never();

        let analytics = AnalyticsService::new(Arc::new(links), Arc::new(store));
        assert!(matches!(
            analytics.record_click(7, "bob").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_anonymous_passed_as_no_visitor() {
        let mut links = MockLinkStore::new();
        links.expect_find_link().returning(|id| Ok(Some(link(id))));
        let mut store = MockAnalyticsStore::new();
        store
            .expect_record_click()
            .with(eq(3), eq(None::<String>))
            .times(1)
            .returning(|link_id, _| {
                let now = chrono::Utc::now();
                Ok(Analytics {
                    id: 1,
                    link_id,
                    click_count: 1,
                    visitors: Vec::new(),
                    created_at: now,
                    updated_at: now,
                })
            });

        let analytics = AnalyticsService::new(Arc::new(links), Arc::new(store));
        let row = analytics.record_click(3, ANONYMOUS).await.unwrap();
        assert_eq!(row.click_count, 1);
    }
}
