use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::{password, TokenService};
use crate::db::{AnalyticsStore, IdentityStore, LinkStore, LinkWithAnalytics, NewUser, Profile, User, UserPatch};
use crate::error::{AppError, AuthError};
use crate::Result;

/// Partial profile update. Missing and empty fields both mean "leave as is",
/// so a field can never be blanked through this type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Signup, login and profile management.
pub struct UserService {
    identities: Arc<dyn IdentityStore>,
    links: Arc<dyn LinkStore>,
    analytics: Arc<dyn AnalyticsStore>,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        links: Arc<dyn LinkStore>,
        analytics: Arc<dyn AnalyticsStore>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            identities,
            links,
            analytics,
            tokens,
        }
    }

    pub async fn signup(
        &self,
        full_name: &str,
        username: &str,
        bio: &str,
        password: &str,
    ) -> Result<User> {
        if full_name.is_empty() || username.is_empty() || password.is_empty() {
            return Err(AppError::ValidationError("required fields are missing".into()));
        }

        // Fast path only: the unique constraint still decides a concurrent race.
        if self.identities.find_user_by_username(username).await?.is_some() {
            return Err(AppError::Conflict("username already exists".into()));
        }

        let password_hash = password::hash_password_blocking(password.to_string()).await?;
        let user = self
            .identities
            .insert_user(NewUser {
                full_name: full_name.to_string(),
                username: username.to_string(),
                bio: bio.to_string(),
                password_hash,
            })
            .await?;

        info!("Created user {} (id {})", user.username, user.id);
        Ok(user)
    }

    /// Returns a bearer token. Unknown user and wrong password are indistinguishable.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let user = self
            .identities
            .find_user_by_username(username)
            .await?
            .ok_or(AppError::AuthError(AuthError::InvalidCredentials))?;

        password::verify_password_blocking(user.password_hash, password.to_string()).await?;

        self.tokens.issue(&user.username)
    }

    pub async fn profile(&self, username: &str) -> Result<Profile> {
        let user = self.require_user(username).await?;
        let links = self.links.links_for_user(user.id).await?;
        let mut analytics = self
            .analytics
            .analytics_for_links(links.iter().map(|l| l.id).collect())
            .await?;

        let links = links
            .into_iter()
            .map(|link| LinkWithAnalytics {
                analytics: analytics.remove(&link.id),
                link,
            })
            .collect();

        Ok(Profile::new(user, links))
    }

    pub async fn update(&self, username: &str, update: ProfileUpdate) -> Result<User> {
        let user = self.require_user(username).await?;

        let password_hash = match non_empty(update.password) {
            Some(password) => Some(password::hash_password_blocking(password).await?),
            None => None,
        };
        let patch = UserPatch {
            full_name: non_empty(update.full_name),
            bio: non_empty(update.bio),
            password_hash,
        };
        if patch.is_empty() {
            debug!("Profile update for {} changes nothing", username);
        }

        self.identities
            .update_user(user.id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }

    /// Removes the user together with their links and analytics.
    pub async fn delete(&self, username: &str) -> Result<()> {
        let user = self.require_user(username).await?;
        if !self.identities.delete_user(user.id).await? {
            return Err(AppError::NotFound("user not found".into()));
        }

        info!("Deleted user {} (id {})", user.username, user.id);
        Ok(())
    }

    async fn require_user(&self, username: &str) -> Result<User> {
        self.identities
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }
}
