/// Follow graph
use super::UserDirectory;
use crate::db::FollowStore;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::middleware::Identity;
use crate::models::Follow;
use std::sync::Arc;

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowStore>,
    directory: UserDirectory,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowStore>, directory: UserDirectory) -> Self {
        Self { follows, directory }
    }

    /// Follow `target` (internal or external id)
    pub async fn follow(&self, identity: &Identity, target: &str) -> Result<Follow> {
        let result = async {
            let follower = self.directory.require_acting(identity).await?;
            let followee = self.directory.resolve_either(target).await?;
            if follower.id == followee.id {
                return Err(AppError::ValidationError(
                    "Cannot follow yourself".to_string(),
                ));
            }
            self.follows.insert(follower.id, followee.id).await
        }
        .await;
        metrics::record_action("follow", &result);

        let follow = result?;
        tracing::info!(follower_id = %follow.follower_id, followee_id = %follow.followee_id, "user followed");
        Ok(follow)
    }

    /// Remove the edge to `target`; a missing edge is not an error
    pub async fn unfollow(&self, identity: &Identity, target: &str) -> Result<()> {
        let result = async {
            let follower = self.directory.require_acting(identity).await?;
            let followee = self.directory.resolve_either(target).await?;
            let removed = self.follows.delete(follower.id, followee.id).await?;
            Ok::<_, AppError>((follower.id, followee.id, removed))
        }
        .await;
        metrics::record_action("unfollow", &result);

        let (follower_id, followee_id, removed) = result?;
        if removed {
            tracing::info!(follower_id = %follower_id, followee_id = %followee_id, "user unfollowed");
        }
        Ok(())
    }

    /// Whether the caller follows `target`; anonymous callers and failed
    /// lookups read as `false`
    pub async fn follow_status(&self, identity: Option<&Identity>, target: &str) -> bool {
        let lookup = async {
            let Some(follower) = self.directory.find_acting(identity).await? else {
                return Ok(false);
            };
            let Some(followee) = self.directory.find_either(target).await? else {
                return Ok(false);
            };
            self.follows.exists(follower.id, followee.id).await
        };

        lookup.await.unwrap_or_else(|e: AppError| {
            tracing::warn!(user = %target, error = %e, "follow status lookup failed");
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Fixture;

    #[tokio::test]
    async fn test_follow_and_status() {
        let fx = Fixture::new();
        let (alice, alice_id) = fx.user("user_alice", "Alice").await;
        let (_, bob_id) = fx.user("user_bob", "Bob").await;

        fx.state.follows.follow(&bob_id, &alice.id.to_string()).await.unwrap();
        assert!(fx.state.follows.follow_status(Some(&bob_id), "user_alice").await);
        assert!(!fx.state.follows.follow_status(Some(&alice_id), "user_bob").await);
        assert!(!fx.state.follows.follow_status(None, "user_alice").await);

        let dup = fx.state.follows.follow(&bob_id, "user_alice").await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_self_follow_is_rejected_in_either_form() {
        let fx = Fixture::new();
        let (alice, alice_id) = fx.user("user_alice", "Alice").await;

        for target in [alice.id.to_string(), "user_alice".to_string()] {
            let err = fx.state.follows.follow(&alice_id, &target).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
        let profile = fx.state.users.get_profile("user_alice").await.unwrap();
        assert_eq!(profile.following_count, 0);
    }

    #[tokio::test]
    async fn test_unfollow_is_idempotent() {
        let fx = Fixture::new();
        fx.user("user_alice", "Alice").await;
        let (_, bob_id) = fx.user("user_bob", "Bob").await;

        fx.state.follows.unfollow(&bob_id, "user_alice").await.unwrap();
        fx.state.follows.follow(&bob_id, "user_alice").await.unwrap();
        fx.state.follows.unfollow(&bob_id, "user_alice").await.unwrap();
        fx.state.follows.unfollow(&bob_id, "user_alice").await.unwrap();

        assert!(!fx.state.follows.follow_status(Some(&bob_id), "user_alice").await);
    }

    #[tokio::test]
    async fn test_unknown_target_is_not_found() {
        let fx = Fixture::new();
        let (_, bob_id) = fx.user("user_bob", "Bob").await;

        let follow = fx.state.follows.follow(&bob_id, "user_ghost").await;
        assert!(matches!(follow, Err(AppError::NotFound(_))));
        let unfollow = fx.state.follows.unfollow(&bob_id, "user_ghost").await;
        assert!(matches!(unfollow, Err(AppError::NotFound(_))));
    }
}
