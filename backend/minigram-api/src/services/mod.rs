/// Business logic layer for minigram-api
///
/// Services compose the stores into the operations exposed over HTTP. They
/// own validation, identity resolution and ownership checks; handlers only
/// decode requests and shape responses.
pub mod comments;
pub mod feed;
pub mod follows;
pub mod likes;
pub mod posts;
pub mod search;
pub mod users;

pub use comments::CommentService;
pub use feed::FeedAssembler;
pub use follows::FollowService;
pub use likes::LikeService;
pub use posts::PostService;
pub use search::SearchService;
pub use users::UserDirectory;

use crate::error::{AppError, Result};
use crate::models::ImageUpload;

/// Check an uploaded image against the size cap and MIME type and return
/// its content type.
pub(crate) fn validate_image(image: &ImageUpload, max_bytes: usize) -> Result<String> {
    if image.bytes.is_empty() {
        return Err(AppError::ValidationError("Image is required".to_string()));
    }

    if image.bytes.len() > max_bytes {
        return Err(AppError::ValidationError(format!(
            "Image must be {} or smaller",
            human_size(max_bytes)
        )));
    }

    let content_type = image
        .content_type
        .as_deref()
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .filter(|m| m.type_() == mime::IMAGE)
        .ok_or_else(|| AppError::ValidationError("File must be an image".to_string()))?;

    Ok(content_type.essence_str().to_string())
}

/// Resolve an optional page size: default when absent, positive, capped
pub(crate) fn page_limit(requested: Option<i64>, default: i64, max: i64) -> Result<i64> {
    match requested {
        None => Ok(default.min(max)),
        Some(limit) if limit <= 0 => Err(AppError::ValidationError(
            "limit must be a positive integer".to_string(),
        )),
        Some(limit) => Ok(limit.min(max)),
    }
}

fn human_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::LimitsConfig;
    use crate::db::{InMemoryStore, Stores};
    use crate::middleware::Identity;
    use crate::models::{ImageUpload, User};
    use crate::state::AppState;
    use crate::storage::InMemoryMediaStore;
    use std::sync::Arc;

    /// Application state over in-memory stores with handles kept for
    /// inspection
    pub struct Fixture {
        pub store: Arc<InMemoryStore>,
        pub media: Arc<InMemoryMediaStore>,
        pub state: AppState,
    }

    impl Fixture {
        pub fn new() -> Self {
            let store = Arc::new(InMemoryStore::new());
            let media = Arc::new(InMemoryMediaStore::new("http://cdn.test/uploads"));
            let state = AppState::new(
                Stores::in_memory(store.clone()),
                media.clone(),
                LimitsConfig::default(),
                "user_",
            );
            Self { store, media, state }
        }

        /// Sync a user and return it with an identity for that user
        pub async fn user(&self, external_id: &str, name: &str) -> (User, Identity) {
            let identity = Identity {
                external_id: external_id.to_string(),
                name: Some(name.to_string()),
            };
            let user = self.state.users.sync_user(&identity, None).await.unwrap();
            (user, identity)
        }
    }

    pub fn jpeg(len: usize) -> ImageUpload {
        ImageUpload {
            bytes: vec![0xFF; len],
            content_type: Some("image/jpeg".to_string()),
            file_name: Some("photo.jpg".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_image_rules() {
        let ok = testing::jpeg(1024);
        assert_eq!(validate_image(&ok, 5 * 1024 * 1024).unwrap(), "image/jpeg");

        let too_big = testing::jpeg(5 * 1024 * 1024 + 1);
        let err = validate_image(&too_big, 5 * 1024 * 1024).unwrap_err();
        assert!(err.to_string().contains("5MB"));

        let pdf = ImageUpload {
            content_type: Some("application/pdf".to_string()),
            ..testing::jpeg(10)
        };
        assert!(matches!(
            validate_image(&pdf, 1024),
            Err(AppError::ValidationError(_))
        ));

        let untyped = ImageUpload {
            content_type: None,
            ..testing::jpeg(10)
        };
        assert!(validate_image(&untyped, 1024).is_err());
    }

    #[test]
    fn test_page_limit() {
        assert_eq!(page_limit(None, 10, 50).unwrap(), 10);
        assert_eq!(page_limit(Some(25), 10, 50).unwrap(), 25);
        assert_eq!(page_limit(Some(500), 10, 50).unwrap(), 50);
        assert!(page_limit(Some(0), 10, 50).is_err());
        assert!(page_limit(Some(-3), 10, 50).is_err());
    }
}
