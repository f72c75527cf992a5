/// Comment handlers
use super::{entity_id, require_uuid, success};
use crate::error::{AppError, Result};
use crate::middleware::Identity;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentRequest {
    pub post_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentRequest {
    pub comment_id: Option<String>,
}

/// GET /api/comments/{post_id}
pub async fn list_comments(
    state: web::Data<AppState>,
    post_id: web::Path<String>,
) -> Result<HttpResponse> {
    let comments = match entity_id(&post_id, "Post") {
        Ok(post_id) => state.comments.list_comments(post_id).await?,
        Err(_) => Vec::new(),
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "count": comments.len(),
        "data": comments,
    })))
}

/// POST /api/comments
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<AddCommentRequest>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let post_id = require_uuid(body.post_id.as_deref(), "postId")?;
    let content = body
        .content
        .ok_or_else(|| AppError::ValidationError("content is required".to_string()))?;

    let comment = state
        .comments
        .add_comment(&identity, post_id, &content)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "comment": comment })))
}

/// DELETE /api/comments
pub async fn delete_comment(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<DeleteCommentRequest>,
) -> Result<HttpResponse> {
    let raw = body
        .comment_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::ValidationError("commentId is required".to_string()))?;
    let comment_id = entity_id(raw, "Comment")?;

    state.comments.delete_comment(&identity, comment_id).await?;
    Ok(success())
}
