use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub bio: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub bio: String,
    pub password_hash: String,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.bio.is_none() && self.password_hash.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Link {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPatch {
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Analytics {
    pub id: i64,
    pub link_id: i64,
    pub click_count: i64,
    /// Distinct named visitors in first-click order.
    pub visitors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkWithAnalytics {
    #[serde(flatten)]
    pub link: Link,
    pub analytics: Option<Analytics>,
}

/// Public view of a user: no password hash, links in creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub bio: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub links: Vec<LinkWithAnalytics>,
}

impl Profile {
    pub fn new(user: User, links: Vec<LinkWithAnalytics>) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            username: user.username,
            bio: user.bio,
            created_at: user.created_at,
            updated_at: user.updated_at,
            links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            full_name: "Alice".into(),
            username: "alice".into(),
            bio: "bio".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));

        let json = serde_json::to_value(Profile::new(user(), vec![])).unwrap();
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["links"], serde_json::json!([]));
    }

    #[test]
    fn test_link_with_analytics_is_flat() {
        let now = Utc::now();
        let entry = LinkWithAnalytics {
            link: Link {
                id: 7,
                title: "My Site".into(),
                url: "https://a.example".into(),
                user_id: 1,
                created_at: now,
                updated_at: now,
            },
            analytics: None,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["url"], "https://a.example");
        assert!(json["analytics"].is_null());
    }

    #[test]
    fn test_empty_patch() {
        assert!(UserPatch::default().is_empty());
        assert!(!UserPatch { bio: Some("x".into()), ..Default::default() }.is_empty());
    }
}
