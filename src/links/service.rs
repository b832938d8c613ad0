use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::db::{IdentityStore, Link, LinkPatch, LinkStore, User};
use crate::error::AppError;
use crate::users::non_empty;
use crate::Result;

/// Accepts only syntactically valid absolute URIs.
pub fn validate_url(raw: &str) -> Result<()> {
    Url::parse(raw)
        .map(|_| ())
        .map_err(|_| AppError::ValidationError("invalid url".into()))
}

/// Link CRUD on behalf of an owner.
///
/// Every lookup filters on the owner as well as the link id, so touching
/// someone else's link fails exactly like touching a missing one.
pub struct LinkService {
    identities: Arc<dyn IdentityStore>,
    links: Arc<dyn LinkStore>,
}

impl LinkService {
    pub fn new(identities: Arc<dyn IdentityStore>, links: Arc<dyn LinkStore>) -> Self {
        Self { identities, links }
    }

    pub async fn create(&self, owner: &str, title: &str, url: &str) -> Result<Link> {
        if title.is_empty() || url.is_empty() {
            return Err(AppError::ValidationError("required fields are missing".into()));
        }
        validate_url(url)?;

        let owner = self.resolve_owner(owner).await?;
        if self.links.url_exists(url).await? {
            return Err(AppError::Conflict("link already exists".into()));
        }

        let link = self
            .links
            .insert_link(owner.id, title.to_string(), url.to_string())
            .await?;
        info!("User {} created link {}", owner.username, link.id);
        Ok(link)
    }

    /// Empty `title`/`url` leave the stored value unchanged.
    pub async fn update(
        &self,
        owner: &str,
        link_id: i64,
        title: Option<String>,
        url: Option<String>,
    ) -> Result<Link> {
        let patch = LinkPatch {
            title: non_empty(title),
            url: non_empty(url),
        };
        if let Some(url) = &patch.url {
            validate_url(url)?;
        }

        let owner = self.resolve_owner(owner).await?;
        self.links
            .update_owned_link(link_id, owner.id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("link not found".into()))
    }

    pub async fn delete(&self, owner: &str, link_id: i64) -> Result<()> {
        let owner = self.resolve_owner(owner).await?;
        if !self.links.delete_owned_link(link_id, owner.id).await? {
            return Err(AppError::NotFound("link not found".into()));
        }

        info!("User {} deleted link {}", owner.username, link_id);
        Ok(())
    }

    async fn resolve_owner(&self, username: &str) -> Result<User> {
        self.identities
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, NewUser};

    async fn setup() -> (LinkService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for username in ["alice", "bob"] {
            store
                .insert_user(NewUser {
                    full_name: username.to_uppercase(),
                    username: username.into(),
                    bio: String::new(),
                    password_hash: "hash".into(),
                })
                .await
                .unwrap();
        }
        (LinkService::new(store.clone(), store.clone()), store)
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://a.example").is_ok());
        assert!(validate_url("http://localhost:8080/path?q=1").is_ok());
        assert!(validate_url("mailto:someone@example.com").is_ok());
        assert!(validate_url("not-a-url").is_err());
        assert!(validate_url("/relative/path").is_err());
        assert!(validate_url("https://").is_err());
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (links, _) = setup().await;

        assert!(matches!(
            links.create("alice", "", "https://a.example").await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            links.create("alice", "Title", "").await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            links.create("alice", "Title", "not-a-url").await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            links.create("ghost", "Title", "https://a.example").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_url_unique_globally() {
        let (links, _) = setup().await;
        links.create("alice", "Mine", "https://a.example").await.unwrap();

        assert!(matches!(
            links.create("alice", "Again", "https://a.example").await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            links.create("bob", "Theirs", "https://a.example").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (links, _) = setup().await;
        let link = links.create("alice", "Original", "https://a.example").await.unwrap();

        let updated = links
            .update("alice", link.id, Some("Renamed".into()), Some(String::new()))
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.url, "https://a.example");

        let updated = links
            .update("alice", link.id, None, Some("https://b.example".into()))
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.url, "https://b.example");

        assert!(matches!(
            links.update("alice", link.id, None, Some("not-a-url".into())).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_foreign_link_is_not_found() {
        let (links, store) = setup().await;
        let link = links.create("alice", "Alice's", "https://a.example").await.unwrap();

        assert!(matches!(
            links.update("bob", link.id, Some("Hijacked".into()), None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(links.delete("bob", link.id).await, Err(AppError::NotFound(_))));

        let stored = store.find_link(link.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Alice's");
    }

    #[tokio::test]
    async fn test_delete() {
        let (links, store) = setup().await;
        let link = links.create("alice", "Gone soon", "https://a.example").await.unwrap();

        links.delete("alice", link.id).await.unwrap();
        assert!(store.find_link(link.id).await.unwrap().is_none());
        assert!(matches!(links.delete("alice", link.id).await, Err(AppError::NotFound(_))));

        // URL is free again
        assert!(links.create("bob", "Reused", "https://a.example").await.is_ok());
    }
}
