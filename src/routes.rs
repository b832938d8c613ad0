//! HTTP route table.

use std::sync::Arc;

use actix_web::{error::JsonPayloadError, web, HttpRequest};
use tracing::debug;

use crate::analytics::handlers::track_click;
use crate::auth::{AccessGate, TokenService};
use crate::error::AppError;
use crate::links::handlers::{create_link, delete_link, update_link};
use crate::users::handlers::{delete_user, get_profile, login, signup, update_user};
use crate::health_check;

fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Rejected JSON body on {}: {}", req.path(), err);
    AppError::ValidationError(format!("Invalid input: {}", err)).into()
}

/// Registers every endpoint. API scopes live under `base_path` (`""` for the
/// root); `/health` is always at the root. `tokens` backs the access gates.
pub fn configure_routes(cfg: &mut web::ServiceConfig, tokens: Arc<TokenService>, base_path: &str) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/health", web::get().to(health_check))
        .service(
            web::scope(&format!("{}/users", base_path))
                .route("/signup", web::post().to(signup))
                .route("/login", web::post().to(login))
                .service(
                    web::resource("")
                        .wrap(AccessGate::mandatory(tokens.clone()))
                        .route(web::put().to(update_user))
                        .route(web::delete().to(delete_user)),
                )
                .route("/{username}", web::get().to(get_profile)),
        )
        .service(
            web::scope(&format!("{}/links", base_path))
                .wrap(AccessGate::mandatory(tokens.clone()))
                .route("", web::post().to(create_link))
                .route("/{id}", web::put().to(update_link))
                .route("/{id}", web::delete().to(delete_link)),
        )
        .service(
            web::scope(&format!("{}/analytics", base_path))
                .wrap(AccessGate::optional(tokens))
                .route("/{id}/click", web::post().to(track_click)),
        );
}
