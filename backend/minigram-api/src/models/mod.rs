/// Data models for minigram-api
///
/// Row types mirror the Postgres tables and views. View types are the JSON
/// shapes returned to clients and are assembled by the services.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Display names longer than this are rejected on edit and truncated on sync
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;

// ============================================================================
// Rows
// ============================================================================

/// A user known to the directory, keyed by internal id and external id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub image_url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub followee_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Live per-post counters (`post_stats` view)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct PostStats {
    pub likes_count: i64,
    pub comments_count: i64,
}

/// Live per-user counters (`user_stats` view)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct UserStats {
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for AuthorView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            external_id: user.external_id.clone(),
            name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub author: AuthorView,
    pub image_url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes_count: i64,
    pub comments_count: i64,
}

impl PostView {
    pub fn assemble(post: Post, author: &User, stats: PostStats) -> Self {
        Self {
            id: post.id,
            author: AuthorView::from(author),
            image_url: post.image_url,
            caption: post.caption,
            created_at: post.created_at,
            updated_at: post.updated_at,
            likes_count: stats.likes_count,
            comments_count: stats.comments_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: AuthorView,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentView {
    pub fn assemble(comment: Comment, author: &User) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            author: AuthorView::from(author),
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

/// Profile header data: the user plus live counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileView {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
}

impl UserProfileView {
    pub fn assemble(user: User, stats: UserStats) -> Self {
        Self {
            id: user.id,
            external_id: user.external_id,
            name: user.display_name,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
            posts_count: stats.posts_count,
            followers_count: stats.followers_count,
            following_count: stats.following_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            external_id: user.external_id,
            name: user.display_name,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: Uuid,
    pub author: AuthorView,
    pub image_url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One page of the feed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    /// True when the page came back full-sized; a full final page yields one
    /// extra empty fetch.
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    pub users: Vec<UserSummary>,
    pub posts: Vec<PostSummary>,
}

// ============================================================================
// Service inputs
// ============================================================================

/// Feed request after HTTP decoding; limits are normalised by the assembler
#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Restrict to one author (internal or external id)
    pub author: Option<String>,
}

/// A binary image received from a client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct NewPost {
    pub image: Option<ImageUpload>,
    #[validate(length(
        max = 2200,
        message = "Caption must be at most 2200 characters"
    ))]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct NewComment {
    #[validate(length(
        min = 1,
        max = 500,
        message = "Comment must be between 1 and 500 characters"
    ))]
    pub content: String,
}

impl NewComment {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Validate)]
pub struct ProfileUpdate {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Name must be between 1 and 50 characters"
    ))]
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn name(name: &str) -> Self {
        Self {
            name: Some(name.trim().to_string()),
            avatar_url: None,
        }
    }

    pub fn avatar(url: String) -> Self {
        Self {
            name: None,
            avatar_url: Some(url),
        }
    }
}

/// Facets searched by `/search`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    All,
    Users,
    Posts,
    /// An unrecognised `type`; matches nothing
    Unknown,
}

impl SearchKind {
    /// Read the `type` query parameter; missing or blank means `All`
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("all") => SearchKind::All,
            Some("users") => SearchKind::Users,
            Some("posts") => SearchKind::Posts,
            Some(_) => SearchKind::Unknown,
        }
    }

    pub fn includes_users(self) -> bool {
        matches!(self, SearchKind::All | SearchKind::Users)
    }

    pub fn includes_posts(self) -> bool {
        matches!(self, SearchKind::All | SearchKind::Posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_limit_counts_characters() {
        let ok = NewPost {
            image: None,
            caption: Some("가".repeat(2200)),
        };
        assert!(ok.validate().is_ok());

        let too_long = NewPost {
            image: None,
            caption: Some("a".repeat(2201)),
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_comment_is_trimmed_before_validation() {
        assert!(NewComment::new("   \n\t ").validate().is_err());
        let comment = NewComment::new("  nice!  ");
        assert_eq!(comment.content, "nice!");
        assert!(comment.validate().is_ok());
        assert!(NewComment::new(&"x".repeat(501)).validate().is_err());
    }

    #[test]
    fn test_profile_name_bounds() {
        assert!(ProfileUpdate::name("").validate().is_err());
        assert!(ProfileUpdate::name(&"n".repeat(51)).validate().is_err());
        assert!(ProfileUpdate::name("Ada").validate().is_ok());
        assert!(ProfileUpdate::avatar("https://x/y.png".into()).validate().is_ok());
    }

    #[test]
    fn test_search_kind_parsing() {
        assert_eq!(SearchKind::from_param(None), SearchKind::All);
        assert_eq!(SearchKind::from_param(Some(" ")), SearchKind::All);
        assert_eq!(SearchKind::from_param(Some("USERS")), SearchKind::Users);
        assert_eq!(SearchKind::from_param(Some("posts")), SearchKind::Posts);
        assert_eq!(SearchKind::from_param(Some("reels")), SearchKind::Unknown);
        let unknown = SearchKind::Unknown;
        assert!(!unknown.includes_users() && !unknown.includes_posts());
        assert!(SearchKind::All.includes_users() && SearchKind::All.includes_posts());
        assert!(!SearchKind::Posts.includes_users());
    }
}
