//! In-memory stores
//!
//! Implements every store trait over a single mutex-guarded state so the
//! services and HTTP layer can run without Postgres. Constraint behaviour
//! matches the schema: unique likes and follows, foreign keys reported as
//! `NotFound`, cascading deletes and counters computed from live rows.

use super::{CommentStore, FollowStore, LikeStore, PostStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::{Comment, Follow, Like, Post, PostStats, ProfileUpdate, User, UserStats};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct State {
    // Vectors keep insertion order, which breaks created_at ties
    users: Vec<User>,
    posts: Vec<Post>,
    likes: Vec<Like>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
    fail_post_inserts: bool,
    fail_profile_updates: bool,
    batch_user_lookups: usize,
}

/// Store backed by process memory
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make subsequent post inserts fail with a database error
    pub fn set_fail_post_inserts(&self, fail: bool) {
        self.state().fail_post_inserts = fail;
    }

    /// Make subsequent profile updates fail with a database error
    pub fn set_fail_profile_updates(&self, fail: bool) {
        self.state().fail_profile_updates = fail;
    }

    /// Number of `find_many` calls served, for N+1 checks
    pub fn batch_user_lookups(&self) -> usize {
        self.state().batch_user_lookups
    }

    pub fn post_count(&self) -> usize {
        self.state().posts.len()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn take(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>> {
        let mut state = self.state();
        state.batch_user_lookups += 1;
        Ok(state
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(|u| (u.id, u.clone()))
            .collect())
    }

    async fn upsert_from_identity(&self, external_id: &str, display_name: &str) -> Result<User> {
        let mut state = self.state();
        if let Some(existing) = state.users.iter().find(|u| u.external_id == external_id) {
            return Ok(existing.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            display_name: display_name.to_string(),
            avatar_url: None,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<User>> {
        let mut state = self.state();
        if state.fail_profile_updates {
            return Err(AppError::Database("profile update rejected".to_string()));
        }

        let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            user.display_name = name.clone();
        }
        if let Some(url) = &update.avatar_url {
            user.avatar_url = Some(url.clone());
        }
        Ok(Some(user.clone()))
    }

    async fn stats(&self, id: Uuid) -> Result<UserStats> {
        let state = self.state();
        Ok(UserStats {
            posts_count: state.posts.iter().filter(|p| p.author_id == id).count() as i64,
            followers_count: state.follows.iter().filter(|f| f.followee_id == id).count() as i64,
            following_count: state.follows.iter().filter(|f| f.follower_id == id).count() as i64,
        })
    }

    async fn search_by_name(&self, query: &str, limit: i64) -> Result<Vec<User>> {
        let state = self.state();
        let mut users: Vec<User> = state
            .users
            .iter()
            .filter(|u| contains_ignore_case(&u.display_name, query))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));
        users.truncate(take(limit));
        Ok(users)
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn insert(&self, author_id: Uuid, image_url: &str, caption: Option<&str>) -> Result<Post> {
        let mut state = self.state();
        if state.fail_post_inserts {
            return Err(AppError::Database("post insert rejected".to_string()));
        }
        if !state.users.iter().any(|u| u.id == author_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            author_id,
            image_url: image_url.to_string(),
            caption: caption.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.state().posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self, author_id: Option<Uuid>, limit: i64, offset: i64) -> Result<Vec<Post>> {
        let state = self.state();
        // Reverse insertion order first so the stable sort keeps the later
        // insert ahead on equal timestamps
        let mut posts: Vec<&Post> = state
            .posts
            .iter()
            .rev()
            .filter(|p| author_id.map_or(true, |a| p.author_id == a))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(posts
            .into_iter()
            .skip(take(offset))
            .take(take(limit))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state();
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        if state.posts.len() == before {
            return Ok(false);
        }
        state.likes.retain(|l| l.post_id != id);
        state.comments.retain(|c| c.post_id != id);
        Ok(true)
    }

    async fn stats(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, PostStats>> {
        let state = self.state();
        Ok(state
            .posts
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| {
                let stats = PostStats {
                    likes_count: state.likes.iter().filter(|l| l.post_id == p.id).count() as i64,
                    comments_count: state.comments.iter().filter(|c| c.post_id == p.id).count()
                        as i64,
                };
                (p.id, stats)
            })
            .collect())
    }

    async fn search_by_caption(&self, query: &str, limit: i64) -> Result<Vec<Post>> {
        let state = self.state();
        let mut posts: Vec<&Post> = state
            .posts
            .iter()
            .rev()
            .filter(|p| {
                p.caption
                    .as_deref()
                    .is_some_and(|c| contains_ignore_case(c, query))
            })
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts.into_iter().take(take(limit)).cloned().collect())
    }
}

#[async_trait]
impl LikeStore for InMemoryStore {
    async fn insert(&self, post_id: Uuid, user_id: Uuid) -> Result<Like> {
        let mut state = self.state();
        if !state.posts.iter().any(|p| p.id == post_id) {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        if state
            .likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id)
        {
            return Err(AppError::Conflict("Post already liked".to_string()));
        }

        let like = Like {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            created_at: Utc::now(),
        };
        state.likes.push(like.clone());
        Ok(like)
    }

    async fn delete(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut state = self.state();
        let before = state.likes.len();
        state
            .likes
            .retain(|l| !(l.post_id == post_id && l.user_id == user_id));
        Ok(state.likes.len() < before)
    }

    async fn exists(&self, post_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self
            .state()
            .likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id))
    }
}

#[async_trait]
impl CommentStore for InMemoryStore {
    async fn insert(&self, post_id: Uuid, author_id: Uuid, content: &str) -> Result<Comment> {
        let mut state = self.state();
        if !state.posts.iter().any(|p| p.id == post_id) {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.state().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state();
        let before = state.comments.len();
        state.comments.retain(|c| c.id != id);
        Ok(state.comments.len() < before)
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let state = self.state();
        let mut comments: Vec<Comment> = state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}

#[async_trait]
impl FollowStore for InMemoryStore {
    async fn insert(&self, follower_id: Uuid, followee_id: Uuid) -> Result<Follow> {
        let mut state = self.state();
        if follower_id == followee_id {
            return Err(AppError::ValidationError("Cannot follow yourself".to_string()));
        }
        if state
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followee_id == followee_id)
        {
            return Err(AppError::Conflict("Already following this user".to_string()));
        }

        let follow = Follow {
            id: Uuid::new_v4(),
            follower_id,
            followee_id,
            created_at: Utc::now(),
        };
        state.follows.push(follow.clone());
        Ok(follow)
    }

    async fn delete(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        let mut state = self.state();
        let before = state.follows.len();
        state
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.followee_id == followee_id));
        Ok(state.follows.len() < before)
    }

    async fn exists(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        Ok(self
            .state()
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followee_id == followee_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(store: &InMemoryStore, external_id: &str) -> User {
        store.upsert_from_identity(external_id, external_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_returns_existing_row() {
        let store = InMemoryStore::new();
        let first = store.upsert_from_identity("user_a", "Ada").await.unwrap();
        let second = store.upsert_from_identity("user_a", "Other").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.display_name, "Ada");
    }

    #[tokio::test]
    async fn test_like_constraints() {
        let store = InMemoryStore::new();
        let alice = user(&store, "user_alice").await;
        let post = PostStore::insert(&store, alice.id, "https://cdn/p.jpg", None)
            .await
            .unwrap();

        LikeStore::insert(&store, post.id, alice.id).await.unwrap();
        let dup = LikeStore::insert(&store, post.id, alice.id).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));

        let missing = LikeStore::insert(&store, Uuid::new_v4(), alice.id).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_post_delete_cascades() {
        let store = InMemoryStore::new();
        let alice = user(&store, "user_alice").await;
        let post = PostStore::insert(&store, alice.id, "https://cdn/p.jpg", Some("hi"))
            .await
            .unwrap();
        LikeStore::insert(&store, post.id, alice.id).await.unwrap();
        CommentStore::insert(&store, post.id, alice.id, "first")
            .await
            .unwrap();

        assert!(PostStore::delete(&store, post.id).await.unwrap());
        assert!(!LikeStore::exists(&store, post.id, alice.id).await.unwrap());
        assert!(store.list_for_post(post.id).await.unwrap().is_empty());
        assert!(!PostStore::delete(&store, post.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_with_paging() {
        let store = InMemoryStore::new();
        let alice = user(&store, "user_alice").await;
        let mut ids = Vec::new();
        for i in 0..5 {
            let post = PostStore::insert(&store, alice.id, &format!("https://cdn/{i}.jpg"), None)
                .await
                .unwrap();
            ids.push(post.id);
        }

        let page = store.list(None, 2, 1).await.unwrap();
        let got: Vec<Uuid> = page.iter().map(|p| p.id).collect();
        assert_eq!(got, vec![ids[3], ids[2]]);
    }
}
