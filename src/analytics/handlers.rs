use actix_web::{web, HttpResponse};
use tracing::info;

use crate::auth::Identity;
use crate::error::AppError;
use crate::links::handlers::parse_id;
use crate::AppState;

pub async fn track_click(
    id: web::Path<String>,
    identity: Identity,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let link_id = parse_id(&id)?;
    info!("Click on link {} by {}", link_id, identity.username());

    let analytics = state
        .analytics
        .record_click(link_id, identity.username())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Click recorded successfully",
        "analytics": analytics,
    })))
}
