/// Like toggle
use super::UserDirectory;
use crate::db::LikeStore;
use crate::error::Result;
use crate::metrics;
use crate::middleware::Identity;
use crate::models::Like;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct LikeService {
    likes: Arc<dyn LikeStore>,
    directory: UserDirectory,
}

impl LikeService {
    pub fn new(likes: Arc<dyn LikeStore>, directory: UserDirectory) -> Self {
        Self { likes, directory }
    }

    /// Like a post. A second like by the same user is a `Conflict` raised by
    /// the store's uniqueness constraint.
    pub async fn like(&self, identity: &Identity, post_id: Uuid) -> Result<Like> {
        let result = async {
            let user = self.directory.require_acting(identity).await?;
            self.likes.insert(post_id, user.id).await
        }
        .await;
        metrics::record_action("like", &result);

        let like = result?;
        tracing::info!(post_id = %post_id, user_id = %like.user_id, "post liked");
        Ok(like)
    }

    /// Remove a like; removing an absent like succeeds
    pub async fn unlike(&self, identity: &Identity, post_id: Uuid) -> Result<()> {
        let result = async {
            let user = self.directory.require_acting(identity).await?;
            self.likes.delete(post_id, user.id).await
        }
        .await;
        metrics::record_action("unlike", &result);

        if result? {
            tracing::info!(post_id = %post_id, external_id = %identity.external_id, "post unliked");
        }
        Ok(())
    }

    /// Whether the caller likes the post. Anonymous callers, unknown users
    /// and lookup failures all read as `false`.
    pub async fn like_status(&self, identity: Option<&Identity>, post_id: Uuid) -> bool {
        let user = match self.directory.find_acting(identity).await {
            Ok(Some(user)) => user,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(post_id = %post_id, error = %e, "like status lookup failed");
                return false;
            }
        };

        self.likes
            .exists(post_id, user.id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(post_id = %post_id, error = %e, "like status lookup failed");
                false
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::models::NewPost;
    use crate::services::testing::{jpeg, Fixture};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_like_scenario_counts_follow_rows() {
        let fx = Fixture::new();
        let (_, alice) = fx.user("user_alice", "Alice").await;
        let (_, bob) = fx.user("user_bob", "Bob").await;
        let post = fx
            .state
            .posts
            .create_post(
                &alice,
                NewPost {
                    image: Some(jpeg(1024)),
                    caption: Some("hello".to_string()),
                },
            )
            .await
            .unwrap();

        fx.state.likes.like(&bob, post.id).await.unwrap();
        assert!(fx.state.likes.like_status(Some(&bob), post.id).await);
        assert_eq!(fx.state.feed.get_post(post.id).await.unwrap().likes_count, 1);

        let dup = fx.state.likes.like(&bob, post.id).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
        assert_eq!(fx.state.feed.get_post(post.id).await.unwrap().likes_count, 1);

        fx.state.likes.unlike(&bob, post.id).await.unwrap();
        assert!(!fx.state.likes.like_status(Some(&bob), post.id).await);
        assert_eq!(fx.state.feed.get_post(post.id).await.unwrap().likes_count, 0);
    }

    #[tokio::test]
    async fn test_unlike_without_like_is_ok() {
        let fx = Fixture::new();
        let (_, alice) = fx.user("user_alice", "Alice").await;

        fx.state.likes.unlike(&alice, Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_like_missing_post_is_not_found() {
        let fx = Fixture::new();
        let (_, alice) = fx.user("user_alice", "Alice").await;

        let err = fx.state.likes.like(&alice, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_anonymous_like_status_is_false() {
        let fx = Fixture::new();
        assert!(!fx.state.likes.like_status(None, Uuid::new_v4()).await);
    }
}
