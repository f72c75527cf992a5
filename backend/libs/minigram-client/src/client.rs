use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde_json::json;
use uuid::Uuid;

use crate::errors::ClientError;
use crate::models::*;

/// Feed reads used by [`crate::FeedPager`]
#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn fetch_posts(
        &self,
        limit: i64,
        offset: i64,
        user_id: Option<&str>,
    ) -> Result<FeedPage, ClientError>;
}

#[async_trait]
pub trait LikeApi: Send + Sync {
    async fn like(&self, post_id: Uuid) -> Result<(), ClientError>;
    async fn unlike(&self, post_id: Uuid) -> Result<(), ClientError>;
    async fn like_status(&self, post_id: Uuid) -> Result<bool, ClientError>;
}

/// Follow calls; `user_id` may be an internal or an external id
#[async_trait]
pub trait FollowApi: Send + Sync {
    async fn follow(&self, user_id: &str) -> Result<(), ClientError>;
    async fn unfollow(&self, user_id: &str) -> Result<(), ClientError>;
    async fn follow_status(&self, user_id: &str) -> Result<bool, ClientError>;
}

/// Minigram API Client
///
/// Every call carries the session token as a bearer header when one is set.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http_client: reqwest::Client,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `https://minigram.example.com`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("Unknown error").to_string());

        tracing::debug!(status = status.as_u16(), message = %message, "minigram API call failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl FeedApi for ApiClient {
    async fn fetch_posts(
        &self,
        limit: i64,
        offset: i64,
        user_id: Option<&str>,
    ) -> Result<FeedPage, ClientError> {
        let mut query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if let Some(user_id) = user_id {
            query.push(("userId", user_id.to_string()));
        }

        let response = self
            .send(self.http_client.get(self.url("/posts")).query(&query))
            .await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl LikeApi for ApiClient {
    async fn like(&self, post_id: Uuid) -> Result<(), ClientError> {
        self.send(
            self.http_client
                .post(self.url("/likes"))
                .json(&json!({ "postId": post_id })),
        )
        .await?;
        Ok(())
    }

    async fn unlike(&self, post_id: Uuid) -> Result<(), ClientError> {
        self.send(
            self.http_client
                .delete(self.url("/likes"))
                .json(&json!({ "postId": post_id })),
        )
        .await?;
        Ok(())
    }

    async fn like_status(&self, post_id: Uuid) -> Result<bool, ClientError> {
        let response = self
            .send(self.http_client.get(self.url(&format!("/likes/{}", post_id))))
            .await?;
        let body: LikeStatusBody = response.json().await?;
        Ok(body.liked)
    }
}

#[async_trait]
impl FollowApi for ApiClient {
    async fn follow(&self, user_id: &str) -> Result<(), ClientError> {
        self.send(
            self.http_client
                .post(self.url("/follows"))
                .json(&json!({ "followingId": user_id })),
        )
        .await?;
        Ok(())
    }

    async fn unfollow(&self, user_id: &str) -> Result<(), ClientError> {
        self.send(
            self.http_client
                .delete(self.url("/follows"))
                .json(&json!({ "followingId": user_id })),
        )
        .await?;
        Ok(())
    }

    async fn follow_status(&self, user_id: &str) -> Result<bool, ClientError> {
        let response = self
            .send(self.http_client.get(self.url(&format!("/follows/{}", user_id))))
            .await?;
        let body: FollowStatusBody = response.json().await?;
        Ok(body.following)
    }
}
