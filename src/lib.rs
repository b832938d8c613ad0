pub mod analytics;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod links;
pub mod routes;
pub mod users;

use std::sync::Arc;
use actix_web::HttpResponse;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use analytics::AnalyticsService;
pub use auth::TokenService;
pub use db::{MemoryStore, PgStore, Store};
pub use links::LinkService;
pub use routes::configure_routes;
pub use users::UserService;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub tokens: Arc<TokenService>,
    pub users: Arc<UserService>,
    pub links: Arc<LinkService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppState {
    /// Wires the services over a single storage backend.
    pub fn new<S: Store + 'static>(config: Settings, store: Arc<S>) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config.auth));

        let users = UserService::new(store.clone(), store.clone(), store.clone(), tokens.clone());
        let links = LinkService::new(store.clone(), store.clone());
        let analytics = AnalyticsService::new(store.clone(), store);

        Self {
            config: Arc::new(config),
            tokens,
            users: Arc::new(users),
            links: Arc::new(links),
            analytics: Arc::new(analytics),
        }
    }
}
