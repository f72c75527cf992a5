/// Feed Assembler - joins posts with their authors and live counters
use super::{page_limit, UserDirectory};
use crate::config::LimitsConfig;
use crate::db::{PostStore, UserStore};
use crate::error::{AppError, Result};
use crate::metrics::FEED_REQUEST_DURATION_SECONDS;
use crate::models::{FeedPage, FeedQuery, Post, PostView};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Clone)]
pub struct FeedAssembler {
    posts: Arc<dyn PostStore>,
    users: Arc<dyn UserStore>,
    directory: UserDirectory,
    default_limit: i64,
    max_limit: i64,
}

impl FeedAssembler {
    pub fn new(
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserStore>,
        directory: UserDirectory,
        limits: &LimitsConfig,
    ) -> Self {
        Self {
            posts,
            users,
            directory,
            default_limit: limits.feed_default_limit,
            max_limit: limits.feed_max_limit,
        }
    }

    /// One page of posts, newest first.
    ///
    /// `has_more` is set when the page came back full. An author that does
    /// not resolve yields an empty page.
    pub async fn list_feed(&self, query: FeedQuery) -> Result<FeedPage> {
        let started = Instant::now();
        let limit = page_limit(query.limit, self.default_limit, self.max_limit)?;
        let offset = query.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::ValidationError(
                "offset must not be negative".to_string(),
            ));
        }

        let scope = if query.author.is_some() { "author" } else { "global" };
        let author_id = match query.author.as_deref() {
            Some(author) => match self.directory.find_either(author).await? {
                Some(user) => Some(user.id),
                None => {
                    return Ok(FeedPage {
                        posts: Vec::new(),
                        has_more: false,
                    })
                }
            },
            None => None,
        };

        let rows = self.posts.list(author_id, limit, offset).await?;
        let has_more = rows.len() as i64 == limit;
        let posts = self.assemble(rows).await?;

        FEED_REQUEST_DURATION_SECONDS
            .with_label_values(&[scope])
            .observe(started.elapsed().as_secs_f64());

        Ok(FeedPage { posts, has_more })
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostView> {
        let post = self
            .posts
            .find(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        self.assemble(vec![post])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    /// Attach authors and counters with one batched lookup each, keeping the
    /// input order
    pub(crate) async fn assemble(&self, posts: Vec<Post>) -> Result<Vec<PostView>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors = self.users.find_many(&author_ids).await?;
        let stats = self.posts.stats(&post_ids).await?;

        let views = posts
            .into_iter()
            .filter_map(|post| {
                let Some(author) = authors.get(&post.author_id) else {
                    tracing::warn!(post_id = %post.id, author_id = %post.author_id, "post author missing from directory");
                    return None;
                };
                let counters = stats.get(&post.id).copied().unwrap_or_default();
                Some(PostView::assemble(post, author, counters))
            })
            .collect();

        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPost;
    use crate::services::testing::{jpeg, Fixture};

    async fn seed_posts(fx: &Fixture, external_id: &str, count: usize) -> Vec<Uuid> {
        let (_, identity) = fx.user(external_id, external_id).await;
        let mut ids = Vec::new();
        for i in 0..count {
            let view = fx
                .state
                .posts
                .create_post(
                    &identity,
                    NewPost {
                        image: Some(jpeg(64)),
                        caption: Some(format!("post {i}")),
                    },
                )
                .await
                .unwrap();
            ids.push(view.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_pages_are_ordered_newest_first_across_pages() {
        let fx = Fixture::new();
        seed_posts(&fx, "user_alice", 7).await;

        let first = fx
            .state
            .feed
            .list_feed(FeedQuery {
                limit: Some(3),
                offset: Some(0),
                author: None,
            })
            .await
            .unwrap();
        let second = fx
            .state
            .feed
            .list_feed(FeedQuery {
                limit: Some(3),
                offset: Some(3),
                author: None,
            })
            .await
            .unwrap();

        assert_eq!(first.posts.len(), 3);
        assert!(first.has_more);
        for page in [&first, &second] {
            assert!(page.posts.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        }
        let last_of_first = first.posts.last().unwrap();
        let first_of_second = second.posts.first().unwrap();
        assert!(last_of_first.created_at >= first_of_second.created_at);
        assert_ne!(last_of_first.id, first_of_second.id);
    }

    #[tokio::test]
    async fn test_has_more_is_page_full_heuristic() {
        let fx = Fixture::new();
        seed_posts(&fx, "user_alice", 4).await;

        let page = fx
            .state
            .feed
            .list_feed(FeedQuery {
                limit: Some(2),
                offset: Some(2),
                author: None,
            })
            .await
            .unwrap();
        assert!(page.has_more);

        let tail = fx
            .state
            .feed
            .list_feed(FeedQuery {
                limit: Some(2),
                offset: Some(4),
                author: None,
            })
            .await
            .unwrap();
        assert!(tail.posts.is_empty());
        assert!(!tail.has_more);
    }

    #[tokio::test]
    async fn test_author_filter_accepts_either_id_form() {
        let fx = Fixture::new();
        let alice_posts = seed_posts(&fx, "user_alice", 2).await;
        seed_posts(&fx, "user_bob", 3).await;

        let page = fx
            .state
            .feed
            .list_feed(FeedQuery {
                author: Some("user_alice".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let mut got: Vec<Uuid> = page.posts.iter().map(|p| p.id).collect();
        got.sort();
        let mut expected = alice_posts.clone();
        expected.sort();
        assert_eq!(got, expected);
        assert!(page.posts.iter().all(|p| p.author.external_id == "user_alice"));

        let unknown = fx
            .state
            .feed
            .list_feed(FeedQuery {
                author: Some("user_nobody".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(unknown.posts.is_empty());
    }

    #[tokio::test]
    async fn test_default_limit_and_invalid_paging() {
        let fx = Fixture::new();
        seed_posts(&fx, "user_alice", 12).await;

        let page = fx.state.feed.list_feed(FeedQuery::default()).await.unwrap();
        assert_eq!(page.posts.len(), 10);

        let err = fx
            .state
            .feed
            .list_feed(FeedQuery {
                offset: Some(-1),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_authors_are_fetched_in_one_batch() {
        let fx = Fixture::new();
        seed_posts(&fx, "user_alice", 3).await;
        seed_posts(&fx, "user_bob", 3).await;

        let before = fx.store.batch_user_lookups();
        fx.state.feed.list_feed(FeedQuery::default()).await.unwrap();
        assert_eq!(fx.store.batch_user_lookups(), before + 1);
    }

    #[tokio::test]
    async fn test_get_missing_post_is_not_found() {
        let fx = Fixture::new();
        let err = fx.state.feed.get_post(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
