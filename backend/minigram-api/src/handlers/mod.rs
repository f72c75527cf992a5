/// HTTP handlers for the Minigram API
///
/// This module contains handlers for:
/// - Posts: feed pages, single posts, create with image upload, delete
/// - Comments, likes and follows
/// - Users: profile, profile edit, avatar upload, first-sign-in sync
/// - Search
/// - Health checks
pub mod comments;
pub mod follows;
pub mod health;
pub mod likes;
pub mod multipart;
pub mod posts;
pub mod search;
pub mod users;

use crate::error::AppError;
use actix_web::{error::InternalError, web, HttpResponse};
use uuid::Uuid;

/// Register every `/api` route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_summary))
            .route("/health/ready", web::get().to(health::readiness_summary))
            .route("/health/live", web::get().to(health::liveness_check))
            .service(
                web::resource("/posts")
                    .route(web::get().to(posts::list_posts))
                    .route(web::post().to(posts::create_post)),
            )
            .service(
                web::resource("/posts/{id}")
                    .route(web::get().to(posts::get_post))
                    .route(web::delete().to(posts::delete_post)),
            )
            .service(
                web::resource("/comments")
                    .route(web::post().to(comments::add_comment))
                    .route(web::delete().to(comments::delete_comment)),
            )
            .route("/comments/{post_id}", web::get().to(comments::list_comments))
            .service(
                web::resource("/likes")
                    .route(web::post().to(likes::like_post))
                    .route(web::delete().to(likes::unlike_post)),
            )
            .route("/likes/{post_id}", web::get().to(likes::like_status))
            .service(
                web::resource("/follows")
                    .route(web::post().to(follows::follow_user))
                    .route(web::delete().to(follows::unfollow_user)),
            )
            .route("/follows/{user_id}", web::get().to(follows::follow_status))
            .service(
                web::resource("/users/{id}")
                    .route(web::get().to(users::get_user))
                    .route(web::put().to(users::update_user)),
            )
            .route(
                "/users/{id}/upload-image",
                web::post().to(users::upload_profile_image),
            )
            .route("/sync-user", web::post().to(users::sync_user))
            .route("/search", web::get().to(search::search)),
    );
}

/// Extractor settings that keep the `{"error": ...}` body for malformed
/// requests
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(64 * 1024).error_handler(|err, _| {
        bad_request(format!("Invalid JSON body: {}", err))
    }))
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| bad_request(format!("Invalid query string: {}", err))),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| bad_request(format!("Invalid path: {}", err))),
    );
}

fn bad_request(message: String) -> actix_web::Error {
    let err = AppError::BadRequest(message);
    let response = actix_web::ResponseError::error_response(&err);
    InternalError::from_response(err, response).into()
}

/// Parse a required id taken from a JSON body
pub(crate) fn require_uuid(value: Option<&str>, field: &str) -> Result<Uuid, AppError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::ValidationError(format!("{} is required", field)))?;
    Uuid::parse_str(raw).map_err(|_| AppError::ValidationError(format!("Invalid {}", field)))
}

/// Parse the id of an existing entity; unparseable ids name nothing
pub(crate) fn entity_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound(format!("{} not found", what)))
}

pub(crate) fn success() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "success": true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(require_uuid(Some(&id.to_string()), "postId").unwrap(), id);

        let missing = require_uuid(None, "postId").unwrap_err();
        assert_eq!(missing.public_message(), "postId is required");
        let blank = require_uuid(Some("  "), "postId").unwrap_err();
        assert_eq!(blank.public_message(), "postId is required");
        assert!(matches!(
            require_uuid(Some("nope"), "postId"),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_entity_id_maps_garbage_to_not_found() {
        assert!(matches!(entity_id("abc", "Post"), Err(AppError::NotFound(_))));
    }
}
