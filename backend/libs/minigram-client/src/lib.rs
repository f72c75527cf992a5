/// Minigram Client Library
///
/// Typed HTTP client for the Minigram API plus the client-side behaviour the
/// web front end relies on.
///
/// It handles:
/// - Bearer-authenticated calls with `{error}` bodies mapped to `ClientError`
/// - Feed paging with offset tracking and a single in-flight page
/// - Optimistic like/follow toggles that roll back when the call fails

pub mod client;
pub mod errors;
pub mod models;
pub mod pager;
pub mod toggle;

pub use client::{ApiClient, FeedApi, FollowApi, LikeApi};
pub use errors::ClientError;
pub use models::{Author, FeedPage, Post};
pub use pager::{FeedPager, LoadOutcome};
pub use toggle::{OptimisticToggle, ToggleOutcome, ToggleState};
