use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// A feed entry as returned by `/api/posts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub author: Author,
    pub image_url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub likes_count: i64,
    pub comments_count: i64,
}

/// `GET /api/posts` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub count: usize,
    pub has_more: bool,
    pub data: Vec<Post>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LikeStatusBody {
    pub liked: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FollowStatusBody {
    pub following: bool,
}
