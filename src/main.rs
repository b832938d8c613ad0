use std::net::TcpListener;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use linkpage_server::config::CorsConfig;
use linkpage_server::{configure_routes, AppState, PgStore, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn build_cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default().allow_any_origin()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new().context("failed to load configuration")?;
    info!("Configuration loaded successfully ({} environment)", config.environment);

    let store = PgStore::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    store.migrate().await.context("failed to run database migrations")?;
    info!("Database ready");

    let store = Arc::new(store);
    let state = web::Data::new(AppState::new(config.clone(), store.clone()));

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .with_context(|| format!("failed to bind {}:{}", config.server.host, config.server.port))?;
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    info!("API mounted at '{}'", config.server.base_path);

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        let tokens = state.tokens.clone();
        let base_path = state.config.server.base_path.clone();
        App::new()
            .wrap(build_cors(&cors_config))
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(|cfg| configure_routes(cfg, tokens, &base_path))
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .context("server terminated with an error")?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}
