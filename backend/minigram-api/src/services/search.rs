/// Search over display names and captions
use crate::config::LimitsConfig;
use crate::db::{PostStore, UserStore};
use crate::error::Result;
use crate::models::{AuthorView, PostSummary, SearchKind, SearchResults, UserSummary};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct SearchService {
    users: Arc<dyn UserStore>,
    posts: Arc<dyn PostStore>,
    default_limit: i64,
    max_limit: i64,
}

impl SearchService {
    pub fn new(users: Arc<dyn UserStore>, posts: Arc<dyn PostStore>, limits: &LimitsConfig) -> Self {
        Self {
            users,
            posts,
            default_limit: limits.search_default_limit,
            max_limit: limits.search_max_limit,
        }
    }

    /// Case-insensitive substring search.
    ///
    /// Never rejects its input: a blank query or an unknown kind matches
    /// nothing, and a missing or non-positive limit falls back to the default.
    pub async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: Option<i64>,
    ) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() || kind == SearchKind::Unknown {
            return Ok(SearchResults::default());
        }
        let limit = match limit {
            Some(limit) if limit > 0 => limit.min(self.max_limit),
            _ => self.default_limit.min(self.max_limit),
        };

        let users = if kind.includes_users() {
            self.users
                .search_by_name(query, limit)
                .await?
                .into_iter()
                .map(UserSummary::from)
                .collect()
        } else {
            Vec::new()
        };

        let posts = if kind.includes_posts() {
            self.post_summaries(query, limit).await?
        } else {
            Vec::new()
        };

        tracing::debug!(query = %query, users = users.len(), posts = posts.len(), "search completed");
        Ok(SearchResults { users, posts })
    }

    async fn post_summaries(&self, query: &str, limit: i64) -> Result<Vec<PostSummary>> {
        let posts = self.posts.search_by_caption(query, limit).await?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors = self.users.find_many(&author_ids).await?;

        Ok(posts
            .into_iter()
            .filter_map(|post| {
                let author = authors.get(&post.author_id)?;
                Some(PostSummary {
                    id: post.id,
                    author: AuthorView::from(author),
                    image_url: post.image_url,
                    caption: post.caption,
                    created_at: post.created_at,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPost;
    use crate::services::testing::{jpeg, Fixture};

    async fn seed(fx: &Fixture) {
        let (_, alice) = fx.user("user_alice", "Alice Liddell").await;
        fx.user("user_bob", "Bob").await;
        for caption in ["Sunset at the beach", "Morning coffee", "beach volleyball"] {
            fx.state
                .posts
                .create_post(
                    &alice,
                    NewPost {
                        image: Some(jpeg(16)),
                        caption: Some(caption.to_string()),
                    },
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_search_matches_substrings_case_insensitively() {
        let fx = Fixture::new();
        seed(&fx).await;

        let results = fx.state.search.search("BEACH", SearchKind::All, None).await.unwrap();
        assert!(results.users.is_empty());
        assert_eq!(results.posts.len(), 2);
        assert_eq!(results.posts[0].caption.as_deref(), Some("beach volleyball"));
        assert_eq!(results.posts[0].author.name, "Alice Liddell");

        let users = fx.state.search.search("lid", SearchKind::Users, None).await.unwrap();
        assert_eq!(users.users.len(), 1);
        assert!(users.posts.is_empty());
    }

    #[tokio::test]
    async fn test_search_without_matches_is_empty() {
        let fx = Fixture::new();
        seed(&fx).await;

        let results = fx
            .state
            .search
            .search("zzz_no_match", SearchKind::All, None)
            .await
            .unwrap();
        assert_eq!(results, SearchResults::default());

        let blank = fx.state.search.search("   ", SearchKind::All, None).await.unwrap();
        assert_eq!(blank, SearchResults::default());
    }

    #[tokio::test]
    async fn test_search_limit() {
        let fx = Fixture::new();
        seed(&fx).await;

        let one = fx.state.search.search("e", SearchKind::Posts, Some(1)).await.unwrap();
        assert_eq!(one.posts.len(), 1);

        for limit in [Some(0), Some(-4), None] {
            let fallback = fx.state.search.search("e", SearchKind::Posts, limit).await.unwrap();
            assert_eq!(fallback.posts.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_search_tolerates_odd_input() {
        let fx = Fixture::new();
        seed(&fx).await;

        let blank = fx.state.search.search("", SearchKind::Unknown, Some(0)).await.unwrap();
        assert_eq!(blank, SearchResults::default());

        let unknown = fx
            .state
            .search
            .search("beach", SearchKind::Unknown, None)
            .await
            .unwrap();
        assert_eq!(unknown, SearchResults::default());
    }
}
