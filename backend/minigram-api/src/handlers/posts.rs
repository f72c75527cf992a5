/// Post handlers - HTTP endpoints for the feed and post lifecycle
use super::multipart::read_upload_form;
use super::{entity_id, success};
use crate::error::Result;
use crate::middleware::Identity;
use crate::models::{FeedQuery, NewPost};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Internal or external id of the author
    pub user_id: Option<String>,
}

/// GET /api/posts
pub async fn list_posts(
    state: web::Data<AppState>,
    params: web::Query<ListPostsParams>,
) -> Result<HttpResponse> {
    let params = params.into_inner();
    let page = state
        .feed
        .list_feed(FeedQuery {
            limit: params.limit,
            offset: params.offset,
            author: params.user_id.filter(|id| !id.trim().is_empty()),
        })
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "count": page.posts.len(),
        "hasMore": page.has_more,
        "data": page.posts,
    })))
}

/// GET /api/posts/{id}
pub async fn get_post(state: web::Data<AppState>, id: web::Path<String>) -> Result<HttpResponse> {
    let post_id = entity_id(&id, "Post")?;
    let post = state.feed.get_post(post_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": post })))
}

/// POST /api/posts (multipart: `image`, `caption`)
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = read_upload_form(payload, "image", state.limits.max_image_bytes).await?;
    let caption = form.text("caption").map(str::to_string);

    let post = state
        .posts
        .create_post(
            &identity,
            NewPost {
                image: form.image,
                caption,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "post": post })))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let post_id = entity_id(&id, "Post")?;
    state.posts.delete_post(&identity, post_id).await?;
    Ok(success())
}
