/// Like handlers
use super::{entity_id, require_uuid, success};
use crate::error::Result;
use crate::middleware::{Identity, OptionalIdentity};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub post_id: Option<String>,
}

/// POST /api/likes
pub async fn like_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<LikeRequest>,
) -> Result<HttpResponse> {
    let post_id = require_uuid(body.post_id.as_deref(), "postId")?;
    let like = state.likes.like(&identity, post_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "like": like,
    })))
}

/// DELETE /api/likes
pub async fn unlike_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<LikeRequest>,
) -> Result<HttpResponse> {
    let post_id = require_uuid(body.post_id.as_deref(), "postId")?;
    state.likes.unlike(&identity, post_id).await?;
    Ok(success())
}

/// GET /api/likes/{post_id}
pub async fn like_status(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    post_id: web::Path<String>,
) -> HttpResponse {
    let liked = match entity_id(&post_id, "Post") {
        Ok(post_id) => state.likes.like_status(identity.0.as_ref(), post_id).await,
        Err(_) => false,
    };

    HttpResponse::Ok().json(serde_json::json!({ "liked": liked }))
}
