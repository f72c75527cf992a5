/// Follow handlers
use super::success;
use crate::error::{AppError, Result};
use crate::middleware::{Identity, OptionalIdentity};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    /// Internal or external id of the user to follow
    pub following_id: Option<String>,
}

impl FollowRequest {
    fn target(&self) -> Result<&str> {
        self.following_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::ValidationError("followingId is required".to_string()))
    }
}

/// POST /api/follows
pub async fn follow_user(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<FollowRequest>,
) -> Result<HttpResponse> {
    let follow = state.follows.follow(&identity, body.target()?).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "follow": follow,
    })))
}

/// DELETE /api/follows
pub async fn unfollow_user(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<FollowRequest>,
) -> Result<HttpResponse> {
    state.follows.unfollow(&identity, body.target()?).await?;
    Ok(success())
}

/// GET /api/follows/{user_id}
pub async fn follow_status(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    user_id: web::Path<String>,
) -> HttpResponse {
    let following = state
        .follows
        .follow_status(identity.0.as_ref(), &user_id)
        .await;

    HttpResponse::Ok().json(serde_json::json!({ "following": following }))
}
