/// Optimistic like/follow buttons
///
/// The local state flips as soon as the user acts; the API call follows. If
/// the call fails (transport error or non-2xx) the state is restored from the
/// snapshot taken just before the flip. There is no retry.
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::client::{FollowApi, LikeApi};
use crate::errors::ClientError;

/// What the button shows: on/off plus the counter next to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    pub active: bool,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Committed(ToggleState),
    /// The call failed and the pre-toggle state was restored
    RolledBack(ToggleState, ClientError),
    /// A toggle for this button was already pending
    Ignored,
}

pub struct OptimisticToggle {
    state: Mutex<ToggleState>,
    pending: AtomicBool,
}

struct Pending<'a>(&'a AtomicBool);

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl OptimisticToggle {
    pub fn new(active: bool, count: i64) -> Self {
        Self {
            state: Mutex::new(ToggleState { active, count }),
            pending: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ToggleState {
        *self.lock_state()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Flip the state and run `call` with the new `active` value.
    pub async fn toggle<F, Fut>(&self, call: F) -> ToggleOutcome
    where
        F: FnOnce(bool) -> Fut,
        Fut: Future<Output = Result<(), ClientError>>,
    {
        if self.pending.swap(true, Ordering::AcqRel) {
            return ToggleOutcome::Ignored;
        }
        let _pending = Pending(&self.pending);

        let (snapshot, applied) = {
            let mut state = self.lock_state();
            let snapshot = *state;
            state.active = !state.active;
            state.count = if state.active {
                state.count + 1
            } else {
                (state.count - 1).max(0)
            };
            (snapshot, *state)
        };

        match call(applied.active).await {
            Ok(()) => ToggleOutcome::Committed(applied),
            Err(e) => {
                *self.lock_state() = snapshot;
                tracing::warn!(error = %e, "optimistic update rolled back");
                ToggleOutcome::RolledBack(snapshot, e)
            }
        }
    }

    /// Like or unlike `post_id` depending on the current state
    pub async fn toggle_like<A: LikeApi + ?Sized>(&self, api: &A, post_id: Uuid) -> ToggleOutcome {
        self.toggle(|like| async move {
            if like {
                api.like(post_id).await
            } else {
                api.unlike(post_id).await
            }
        })
        .await
    }

    /// Follow or unfollow `user_id` depending on the current state
    pub async fn toggle_follow<A: FollowApi + ?Sized>(&self, api: &A, user_id: &str) -> ToggleOutcome {
        self.toggle(|follow| async move {
            if follow {
                api.follow(user_id).await
            } else {
                api.unfollow(user_id).await
            }
        })
        .await
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ToggleState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeSocial {
        calls: Mutex<Vec<String>>,
        reject_with: Mutex<Option<ClientError>>,
    }

    impl FakeSocial {
        fn record(&self, call: String) -> Result<(), ClientError> {
            self.calls.lock().unwrap().push(call);
            match self.reject_with.lock().unwrap().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LikeApi for FakeSocial {
        async fn like(&self, post_id: Uuid) -> Result<(), ClientError> {
            self.record(format!("like {}", post_id))
        }

        async fn unlike(&self, post_id: Uuid) -> Result<(), ClientError> {
            self.record(format!("unlike {}", post_id))
        }

        async fn like_status(&self, _post_id: Uuid) -> Result<bool, ClientError> {
            Ok(false)
        }
    }

    #[async_trait]
    impl FollowApi for FakeSocial {
        async fn follow(&self, user_id: &str) -> Result<(), ClientError> {
            self.record(format!("follow {}", user_id))
        }

        async fn unfollow(&self, user_id: &str) -> Result<(), ClientError> {
            self.record(format!("unfollow {}", user_id))
        }

        async fn follow_status(&self, _user_id: &str) -> Result<bool, ClientError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_like_then_unlike_commits() {
        let api = FakeSocial::default();
        let post_id = Uuid::new_v4();
        let button = OptimisticToggle::new(false, 4);

        let outcome = button.toggle_like(&api, post_id).await;
        assert_eq!(
            outcome,
            ToggleOutcome::Committed(ToggleState {
                active: true,
                count: 5
            })
        );

        button.toggle_like(&api, post_id).await;
        assert_eq!(button.state(), ToggleState { active: false, count: 4 });
        assert_eq!(
            api.calls(),
            vec![format!("like {}", post_id), format!("unlike {}", post_id)]
        );
    }

    #[tokio::test]
    async fn test_rejected_call_restores_snapshot() {
        let api = FakeSocial::default();
        *api.reject_with.lock().unwrap() = Some(ClientError::Api {
            status: 409,
            message: "Post already liked".to_string(),
        });
        let button = OptimisticToggle::new(false, 1);

        let outcome = button.toggle_like(&api, Uuid::new_v4()).await;

        match outcome {
            ToggleOutcome::RolledBack(state, err) => {
                assert_eq!(state, ToggleState { active: false, count: 1 });
                assert_eq!(err.status(), Some(409));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(button.state(), ToggleState { active: false, count: 1 });
        assert!(!button.is_pending());
    }

    #[tokio::test]
    async fn test_transport_failure_rolls_back_follow() {
        let api = FakeSocial::default();
        *api.reject_with.lock().unwrap() =
            Some(ClientError::Transport("connection refused".to_string()));
        let button = OptimisticToggle::new(true, 10);

        let outcome = button.toggle_follow(&api, "user_bob").await;

        assert!(matches!(outcome, ToggleOutcome::RolledBack(_, _)));
        assert_eq!(button.state(), ToggleState { active: true, count: 10 });
        assert_eq!(api.calls(), vec!["unfollow user_bob".to_string()]);
    }

    #[tokio::test]
    async fn test_toggle_while_pending_is_ignored() {
        let gate = Arc::new(Notify::new());
        let button = OptimisticToggle::new(false, 0);

        let slow = button.toggle(|_| {
            let gate = gate.clone();
            async move {
                gate.notified().await;
                Ok(())
            }
        });
        let (first, second, _) = tokio::join!(slow, button.toggle(|_| async { Ok(()) }), async {
            gate.notify_one();
        });

        assert_eq!(
            first,
            ToggleOutcome::Committed(ToggleState {
                active: true,
                count: 1
            })
        );
        assert_eq!(second, ToggleOutcome::Ignored);
        assert_eq!(button.state(), ToggleState { active: true, count: 1 });
    }

    #[tokio::test]
    async fn test_count_never_goes_negative() {
        let button = OptimisticToggle::new(true, 0);
        let outcome = button.toggle(|_| async { Ok(()) }).await;
        assert_eq!(outcome, ToggleOutcome::Committed(ToggleState { active: false, count: 0 }));
    }
}
