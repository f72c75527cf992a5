/// User handlers - profiles, profile edits, avatars and first-sign-in sync
use super::multipart::read_upload_form;
use crate::error::{AppError, Result};
use crate::middleware::Identity;
use crate::models::{ProfileUpdate, UserSummary};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncUserRequest {
    pub name: Option<String>,
}

/// GET /api/users/{id}
pub async fn get_user(state: web::Data<AppState>, id: web::Path<String>) -> Result<HttpResponse> {
    let user = state.users.get_profile(&id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": user })))
}

/// PUT /api/users/{id}
pub async fn update_user(
    state: web::Data<AppState>,
    identity: Identity,
    id: web::Path<String>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse> {
    let name = body
        .name
        .as_deref()
        .ok_or_else(|| AppError::ValidationError("Name is required".to_string()))?;

    let user = state
        .users
        .update_profile(&identity, &id, ProfileUpdate::name(name))
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": UserSummary::from(user),
    })))
}

/// POST /api/users/{id}/upload-image (multipart: `image`)
pub async fn upload_profile_image(
    state: web::Data<AppState>,
    identity: Identity,
    id: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = read_upload_form(payload, "image", state.limits.max_image_bytes).await?;
    let image = form
        .image
        .ok_or_else(|| AppError::ValidationError("Image is required".to_string()))?;

    let user = state.users.upload_avatar(&identity, &id, image).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "profile_image_url": user.avatar_url,
        "user": UserSummary::from(user),
    })))
}

/// POST /api/sync-user
pub async fn sync_user(
    state: web::Data<AppState>,
    identity: Identity,
    body: Option<web::Json<SyncUserRequest>>,
) -> Result<HttpResponse> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let user = state
        .users
        .sync_user(&identity, body.name.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": UserSummary::from(user),
    })))
}
