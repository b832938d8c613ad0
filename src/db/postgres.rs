use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::models::{Analytics, Link, LinkPatch, NewUser, User, UserPatch};
use crate::db::store::{AnalyticsStore, IdentityStore, LinkStore};
use crate::error::AppError;
use crate::Result;

const USER_COLUMNS: &str = "id, full_name, username, bio, password_hash, created_at, updated_at";
const LINK_COLUMNS: &str = "id, title, url, user_id, created_at, updated_at";

/// Postgres-backed implementation of every store, sharing one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct AnalyticsRow {
    id: i64,
    link_id: i64,
    click_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AnalyticsRow {
    fn with_visitors(self, visitors: Vec<String>) -> Analytics {
        Analytics {
            id: self.id,
            link_id: self.link_id,
            click_count: self.click_count,
            visitors,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct AnalyticsVisitorRow {
    id: i64,
    link_id: i64,
    click_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    username: Option<String>,
}

/// Maps a unique violation to a `Conflict` carrying `message`.
fn conflict_as(message: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |err| match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        other => other.into(),
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.connection_url())
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    async fn visitors_of(
        transaction: &mut Transaction<'_, Postgres>,
        analytics_id: i64,
    ) -> Result<Vec<String>> {
        let visitors = sqlx::query_scalar::<_, String>(
            "SELECT username FROM analytics_visitors WHERE analytics_id = $1 ORDER BY id",
        )
        .bind(analytics_id)
        .fetch_all(&mut **transaction)
        .await?;

        Ok(visitors)
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (full_name, username, bio, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user.full_name)
            .bind(user.username)
            .bind(user.bio)
            .bind(user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_as("username already exists"))?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<Option<User>> {
        let sql = format!(
            "UPDATE users SET \
                full_name = COALESCE($2, full_name), \
                bio = COALESCE($3, bio), \
                password_hash = COALESCE($4, password_hash), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(patch.full_name)
            .bind(patch.bio)
            .bind(patch.password_hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LinkStore for PgStore {
    async fn insert_link(&self, user_id: i64, title: String, url: String) -> Result<Link> {
        let sql = format!(
            "INSERT INTO links (title, url, user_id) VALUES ($1, $2, $3) RETURNING {}",
            LINK_COLUMNS
        );
        let link = sqlx::query_as::<_, Link>(&sql)
            .bind(title)
            .bind(url)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_as("link already exists"))?;

        Ok(link)
    }

    async fn url_exists(&self, url: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM links WHERE url = $1)")
            .bind(url)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn find_link(&self, id: i64) -> Result<Option<Link>> {
        let sql = format!("SELECT {} FROM links WHERE id = $1", LINK_COLUMNS);
        let link = sqlx::query_as::<_, Link>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(link)
    }

    async fn update_owned_link(&self, id: i64, user_id: i64, patch: LinkPatch) -> Result<Option<Link>> {
        let sql = format!(
            "UPDATE links SET \
                title = COALESCE($3, title), \
                url = COALESCE($4, url), \
                updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            LINK_COLUMNS
        );
        let link = sqlx::query_as::<_, Link>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(patch.title)
            .bind(patch.url)
            .fetch_optional(&self.pool)
            .await
            .map_err(conflict_as("link already exists"))?;

        Ok(link)
    }

    async fn delete_owned_link(&self, id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn links_for_user(&self, user_id: i64) -> Result<Vec<Link>> {
        let sql = format!("SELECT {} FROM links WHERE user_id = $1 ORDER BY id", LINK_COLUMNS);
        let links = sqlx::query_as::<_, Link>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(links)
    }
}

#[async_trait]
impl AnalyticsStore for PgStore {
    async fn record_click(&self, link_id: i64, visitor: Option<String>) -> Result<Analytics> {
        let mut transaction = self.begin_transaction().await?;

        // Row stays locked until commit; concurrent clicks serialize here.
        let row = sqlx::query_as::<_, AnalyticsRow>(
            r#"
            INSERT INTO analytics (link_id, click_count)
            VALUES ($1, 1)
            ON CONFLICT (link_id)
            DO UPDATE SET click_count = analytics.click_count + 1, updated_at = NOW()
            RETURNING id, link_id, click_count, created_at, updated_at
            "#,
        )
        .bind(link_id)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AppError::NotFound("link not found".into())
            }
            other => other.into(),
        })?;

        if let Some(username) = visitor {
            sqlx::query(
                r#"
                INSERT INTO analytics_visitors (analytics_id, username)
                VALUES ($1, $2)
                ON CONFLICT (analytics_id, username) DO NOTHING
                "#,
            )
            .bind(row.id)
            .bind(username)
            .execute(&mut *transaction)
            .await?;
        }

        let visitors = Self::visitors_of(&mut transaction, row.id).await?;
        transaction.commit().await?;

        Ok(row.with_visitors(visitors))
    }

    async fn analytics_for_link(&self, link_id: i64) -> Result<Option<Analytics>> {
        let mut found = self.analytics_for_links(vec![link_id]).await?;
        Ok(found.remove(&link_id))
    }

    async fn analytics_for_links(&self, link_ids: Vec<i64>) -> Result<HashMap<i64, Analytics>> {
        if link_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, AnalyticsVisitorRow>(
            r#"
            SELECT a.id, a.link_id, a.click_count, a.created_at, a.updated_at, v.username
            FROM analytics a
            LEFT JOIN analytics_visitors v ON v.analytics_id = a.id
            WHERE a.link_id = ANY($1)
            ORDER BY a.link_id, v.id
            "#,
        )
        .bind(&link_ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut analytics: HashMap<i64, Analytics> = HashMap::new();
        for row in rows {
            let entry = analytics.entry(row.link_id).or_insert_with(|| Analytics {
                id: row.id,
                link_id: row.link_id,
                click_count: row.click_count,
                visitors: Vec::new(),
                created_at: row.created_at,
                updated_at: row.updated_at,
            });
            if let Some(username) = row.username {
                entry.visitors.push(username);
            }
        }

        Ok(analytics)
    }
}
