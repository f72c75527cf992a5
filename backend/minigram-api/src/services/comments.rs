/// Comment service - comment threads on posts
use super::UserDirectory;
use crate::db::{CommentStore, UserStore};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::middleware::Identity;
use crate::models::{CommentView, NewComment};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentStore>,
    users: Arc<dyn UserStore>,
    directory: UserDirectory,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentStore>,
        users: Arc<dyn UserStore>,
        directory: UserDirectory,
    ) -> Self {
        Self {
            comments,
            users,
            directory,
        }
    }

    /// Add a comment; content is stored trimmed
    pub async fn add_comment(
        &self,
        identity: &Identity,
        post_id: Uuid,
        content: &str,
    ) -> Result<CommentView> {
        let result = async {
            let new_comment = NewComment::new(content);
            new_comment.validate()?;

            let author = self.directory.require_acting(identity).await?;
            let comment = self
                .comments
                .insert(post_id, author.id, &new_comment.content)
                .await?;
            Ok::<_, AppError>(CommentView::assemble(comment, &author))
        }
        .await;
        metrics::record_action("add_comment", &result);

        let view = result?;
        tracing::info!(comment_id = %view.id, post_id = %post_id, user_id = %view.author.id, "comment added");
        Ok(view)
    }

    pub async fn delete_comment(&self, identity: &Identity, comment_id: Uuid) -> Result<()> {
        let result = async {
            let comment = self
                .comments
                .find(comment_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

            let acting = self.directory.find_acting(Some(identity)).await?;
            if acting.map(|u| u.id) != Some(comment.author_id) {
                return Err(AppError::Forbidden(
                    "You can only delete your own comments".to_string(),
                ));
            }

            self.comments.delete(comment.id).await?;
            Ok::<_, AppError>(comment)
        }
        .await;
        metrics::record_action("delete_comment", &result);

        let comment = result?;
        tracing::info!(comment_id = %comment.id, post_id = %comment.post_id, "comment deleted");
        Ok(())
    }

    /// Comments on a post, oldest first
    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentView>> {
        let comments = self.comments.list_for_post(post_id).await?;
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let mut author_ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors = self.users.find_many(&author_ids).await?;

        Ok(comments
            .into_iter()
            .filter_map(|comment| {
                let author = authors.get(&comment.author_id)?;
                Some(CommentView::assemble(comment, author))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPost, PostView};
    use crate::services::testing::{jpeg, Fixture};

    async fn post_by(fx: &Fixture, identity: &Identity) -> PostView {
        fx.state
            .posts
            .create_post(
                identity,
                NewPost {
                    image: Some(jpeg(32)),
                    caption: None,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_comment_scenario() {
        let fx = Fixture::new();
        let (_, alice) = fx.user("user_alice", "Alice").await;
        let post = post_by(&fx, &alice).await;

        let empty = fx.state.comments.add_comment(&alice, post.id, "   ").await;
        assert!(matches!(empty, Err(AppError::ValidationError(_))));

        let view = fx
            .state
            .comments
            .add_comment(&alice, post.id, "  nice!  ")
            .await
            .unwrap();
        assert_eq!(view.content, "nice!");

        let thread = fx.state.comments.list_comments(post.id).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].id, view.id);
        assert_eq!(thread[0].author.name, "Alice");
        assert_eq!(fx.state.feed.get_post(post.id).await.unwrap().comments_count, 1);
    }

    #[tokio::test]
    async fn test_comments_are_listed_oldest_first() {
        let fx = Fixture::new();
        let (_, alice) = fx.user("user_alice", "Alice").await;
        let (_, bob) = fx.user("user_bob", "Bob").await;
        let post = post_by(&fx, &alice).await;

        let first = fx.state.comments.add_comment(&bob, post.id, "first").await.unwrap();
        let second = fx.state.comments.add_comment(&alice, post.id, "second").await.unwrap();

        let thread = fx.state.comments.list_comments(post.id).await.unwrap();
        let ids: Vec<Uuid> = thread.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_delete_comment_checks() {
        let fx = Fixture::new();
        let (_, alice) = fx.user("user_alice", "Alice").await;
        let (_, bob) = fx.user("user_bob", "Bob").await;
        let post = post_by(&fx, &alice).await;
        let comment = fx.state.comments.add_comment(&bob, post.id, "hey").await.unwrap();

        let missing = fx.state.comments.delete_comment(&bob, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let forbidden = fx.state.comments.delete_comment(&alice, comment.id).await;
        assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

        fx.state.comments.delete_comment(&bob, comment.id).await.unwrap();
        assert!(fx.state.comments.list_comments(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_is_not_found() {
        let fx = Fixture::new();
        let (_, alice) = fx.user("user_alice", "Alice").await;

        let err = fx
            .state
            .comments
            .add_comment(&alice, Uuid::new_v4(), "hello?")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
