use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::users::ProfileUpdate;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

pub async fn signup(
    req: web::Json<SignupRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received signup request for username: {}", req.username);
    match state
        .users
        .signup(&req.full_name, &req.username, &req.bio, &req.password)
        .await
    {
        Ok(_) => Ok(HttpResponse::Created().json(serde_json::json!({
            "message": "User created successfully"
        }))),
        Err(e) => {
            warn!("Signup failed for username: {}: {}", req.username, e);
            Err(e)
        }
    }
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for username: {}", req.username);
    match state.users.login(&req.username, &req.password).await {
        Ok(token) => {
            info!("Login successful for username: {}", req.username);
            Ok(HttpResponse::Ok().json(AuthResponse { token }))
        }
        Err(e) => {
            warn!("Login failed for username: {}: {}", req.username, e);
            Err(e)
        }
    }
}

pub async fn get_profile(
    username: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let profile = state.users.profile(&username).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_user(
    user: AuthenticatedUser,
    req: web::Json<ProfileUpdate>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    match state.users.update(&user.0, req.into_inner()).await {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "User updated successfully"
        }))),
        Err(e) => {
            error!("Profile update failed for {}: {}", user.0, e);
            Err(e)
        }
    }
}

pub async fn delete_user(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    match state.users.delete(&user.0).await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "User deleted successfully"
        }))),
        Err(e) => {
            error!("Account deletion failed for {}: {}", user.0, e);
            Err(e)
        }
    }
}
