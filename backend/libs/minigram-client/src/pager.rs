/// Infinite-scroll feed loading
///
/// A pager walks the feed by offset. Only one page request runs at a time:
/// a `load_next` issued while another is in flight returns
/// [`LoadOutcome::Skipped`] without touching the network.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::client::FeedApi;
use crate::errors::ClientError;
use crate::models::Post;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// A page arrived; the pager advanced past it
    Loaded(Vec<Post>),
    /// Another page request was already in flight
    Skipped,
    /// The previous page was short, nothing more to load
    Exhausted,
}

#[derive(Debug)]
struct Cursor {
    offset: i64,
    has_more: bool,
}

pub struct FeedPager<A: FeedApi> {
    api: A,
    limit: i64,
    user_id: Option<String>,
    cursor: Mutex<Cursor>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the request ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<A: FeedApi> FeedPager<A> {
    pub fn new(api: A, limit: i64) -> Self {
        Self {
            api,
            limit,
            user_id: None,
            cursor: Mutex::new(Cursor {
                offset: 0,
                has_more: true,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Restrict the feed to one author's posts (profile grid)
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn offset(&self) -> i64 {
        self.lock_cursor().offset
    }

    pub fn has_more(&self) -> bool {
        self.lock_cursor().has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start over from the first page
    pub fn reset(&self) {
        let mut cursor = self.lock_cursor();
        cursor.offset = 0;
        cursor.has_more = true;
    }

    /// Fetch the next page. On error the cursor is left where it was so the
    /// same page can be requested again.
    pub async fn load_next(&self) -> Result<LoadOutcome, ClientError> {
        if !self.has_more() {
            return Ok(LoadOutcome::Exhausted);
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Ok(LoadOutcome::Skipped);
        }
        let _guard = InFlight(&self.in_flight);

        let offset = self.offset();
        let page = match self
            .api
            .fetch_posts(self.limit, offset, self.user_id.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(offset, error = %e, "feed page request failed");
                return Err(e);
            }
        };

        let mut cursor = self.lock_cursor();
        cursor.offset = offset + page.data.len() as i64;
        cursor.has_more = page.has_more;
        Ok(LoadOutcome::Loaded(page.data))
    }

    fn lock_cursor(&self) -> std::sync::MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
