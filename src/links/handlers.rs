use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Parses a numeric path id; anything else is a 400, not a 404.
pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::ValidationError("Invalid link ID".into())),
    }
}

pub async fn create_link(
    user: AuthenticatedUser,
    req: web::Json<LinkRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("User {} creating link to {}", user.0, req.url);
    match state.links.create(&user.0, &req.title, &req.url).await {
        Ok(link) => Ok(HttpResponse::Created().json(serde_json::json!({
            "message": "Link created successfully",
            "link": link,
        }))),
        Err(e) => {
            warn!("Link creation failed for {}: {}", user.0, e);
            Err(e)
        }
    }
}

pub async fn update_link(
    user: AuthenticatedUser,
    id: web::Path<String>,
    req: web::Json<LinkRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let link_id = parse_id(&id)?;
    let LinkRequest { title, url } = req.into_inner();

    let link = state
        .links
        .update(&user.0, link_id, Some(title), Some(url))
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Link updated successfully",
        "link": link,
    })))
}

pub async fn delete_link(
    user: AuthenticatedUser,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let link_id = parse_id(&id)?;
    state.links.delete(&user.0, link_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Link deleted successfully"
    })))
}
