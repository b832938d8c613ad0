#![allow(dead_code)]

use std::sync::Arc;

use actix_web::web;
use linkpage_server::{AppState, MemoryStore, Settings};

pub const PASSWORD: &str = "password123";

pub fn test_settings() -> Settings {
    settings_with_base_path("/api/v1")
}

pub fn settings_with_base_path(base_path: &str) -> Settings {
    let builder = Settings::builder()
        .expect("defaults")
        .set_override("environment", "test")
        .expect("override")
        .set_override("server.base_path", base_path)
        .expect("override")
        .set_override("auth.jwt_secret", "integration_secret")
        .expect("override");
    Settings::from_builder(builder).expect("Failed to load test config")
}

pub fn test_state() -> web::Data<AppState> {
    state_with(test_settings())
}

pub fn state_with(settings: Settings) -> web::Data<AppState> {
    web::Data::new(AppState::new(settings, Arc::new(MemoryStore::new())))
}

/// Creates `username` through the service layer and returns a bearer header value.
pub async fn register(state: &AppState, username: &str) -> String {
    state
        .users
        .signup(&username.to_uppercase(), username, "", PASSWORD)
        .await
        .expect("signup");
    let token = state.users.login(username, PASSWORD).await.expect("login");
    format!("Bearer {}", token)
}

/// Builds the full application around `state`.
macro_rules! init_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .configure(|cfg| {
                    linkpage_server::configure_routes(
                        cfg,
                        $state.tokens.clone(),
                        &$state.config.server.base_path,
                    )
                }),
        )
        .await
    };
}
