/// Post service - handles post creation and deletion
use super::{validate_image, UserDirectory};
use crate::db::PostStore;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::middleware::Identity;
use crate::models::{NewPost, PostStats, PostView};
use crate::storage::{post_image_key, MediaStore};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostStore>,
    media: Arc<dyn MediaStore>,
    directory: UserDirectory,
    max_image_bytes: usize,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        media: Arc<dyn MediaStore>,
        directory: UserDirectory,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            posts,
            media,
            directory,
            max_image_bytes,
        }
    }

    /// Upload the image and create the post.
    ///
    /// All input checks run before anything is stored. If the row insert
    /// fails the uploaded object is deleted again.
    pub async fn create_post(&self, identity: &Identity, new_post: NewPost) -> Result<PostView> {
        let result = self.publish(identity, new_post).await;
        metrics::record_action("create_post", &result);
        result
    }

    async fn publish(&self, identity: &Identity, new_post: NewPost) -> Result<PostView> {
        new_post.validate()?;
        let image = new_post
            .image
            .ok_or_else(|| AppError::ValidationError("Image is required".to_string()))?;
        let content_type = validate_image(&image, self.max_image_bytes)?;
        let caption = new_post
            .caption
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let author = self.directory.require_acting(identity).await?;

        let key = post_image_key(author.id, image.file_name.as_deref(), &content_type);
        let size = image.bytes.len();
        let image_url = self.media.upload(&key, image.bytes, &content_type).await?;
        metrics::UPLOAD_BYTES.observe(size as f64);

        let post = match self.posts.insert(author.id, &image_url, caption).await {
            Ok(post) => post,
            Err(e) => {
                if let Err(cleanup) = self.media.delete(&key).await {
                    tracing::warn!(key = %key, error = %cleanup, "failed to remove orphaned upload");
                }
                return Err(e);
            }
        };

        tracing::info!(post_id = %post.id, user_id = %author.id, key = %key, "post created");
        Ok(PostView::assemble(post, &author, PostStats::default()))
    }

    /// Delete a post owned by the caller, with its likes, comments and image
    pub async fn delete_post(&self, identity: &Identity, post_id: Uuid) -> Result<()> {
        let result = self.remove(identity, post_id).await;
        metrics::record_action("delete_post", &result);
        result
    }

    async fn remove(&self, identity: &Identity, post_id: Uuid) -> Result<()> {
        let post = self
            .posts
            .find(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let acting = self.directory.find_acting(Some(identity)).await?;
        if acting.map(|u| u.id) != Some(post.author_id) {
            return Err(AppError::Forbidden(
                "You can only delete your own posts".to_string(),
            ));
        }

        match self.media.key_from_url(&post.image_url) {
            Some(key) => {
                if let Err(e) = self.media.delete(&key).await {
                    tracing::warn!(post_id = %post.id, key = %key, error = %e, "failed to delete post image");
                }
            }
            None => {
                tracing::warn!(post_id = %post.id, url = %post.image_url, "post image URL has no recognizable object key");
            }
        }

        self.posts.delete(post.id).await?;
        tracing::info!(post_id = %post.id, user_id = %post.author_id, "post deleted");
        Ok(())
    }
}
