use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info};
use url::Url;

use crate::error::{FeedError, SubmitError};
use crate::fetcher::FetchGateway;
use crate::parser;
use crate::state::{AppState, Feed, FormState, Post, PostId, StateEvent};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The aggregator engine: shared state, a fetch gateway, and a typed
/// event stream for presentation consumers.
///
/// Submission and refresh both funnel their merges through the same
/// write lock, so every merge dedupes against whatever is in state at
/// merge time and lands as one atomic batch.
pub struct App {
    state: RwLock<AppState>,
    gateway: Arc<dyn FetchGateway>,
    events: broadcast::Sender<StateEvent>,
}

impl App {
    pub fn new(gateway: Arc<dyn FetchGateway>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(AppState::new()),
            gateway,
            events,
        }
    }

    /// Subscribe to state change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StateEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    pub async fn feeds(&self) -> Vec<Feed> {
        self.state.read().await.feeds().to_vec()
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.state.read().await.posts().to_vec()
    }

    /// Submit a feed URL: validate, fetch, parse, then record the feed
    /// and merge its posts.
    ///
    /// Emits `FormStateChanged(Sending)` once validation passes, then
    /// `FeedsChanged`/`PostsChanged` and `FormStateChanged(Finished)` on
    /// success or `FormStateChanged(Failed(kind))` on any error. A failed
    /// submission leaves state untouched.
    pub async fn submit(&self, url: &str) -> Result<(), SubmitError> {
        match self.try_submit(url).await {
            Ok(()) => {
                self.emit(StateEvent::FormStateChanged(FormState::Finished));
                Ok(())
            }
            Err(err) => {
                self.emit(StateEvent::FormStateChanged(FormState::Failed(err.kind())));
                Err(err)
            }
        }
    }

    async fn try_submit(&self, url: &str) -> Result<(), SubmitError> {
        // Syntax check only; the parsed form is not kept.
        Url::parse(url)?;

        // Reject duplicates before any network traffic.
        if self.state.read().await.has_feed_link(url) {
            return Err(SubmitError::DuplicateFeed(url.to_string()));
        }

        self.emit(StateEvent::FormStateChanged(FormState::Sending));

        let body = self.gateway.fetch_text(url).await.map_err(FeedError::from)?;
        let parsed = parser::parse(&body).map_err(FeedError::from)?;

        let merged = {
            let mut state = self.state.write().await;
            // Recheck under the write lock: a concurrent submission of
            // the same URL may have landed while we were fetching.
            if state.has_feed_link(url) {
                return Err(SubmitError::DuplicateFeed(url.to_string()));
            }
            state.add_feed(parsed.feed, url);
            state.merge_new_posts(parsed.posts)
        };

        self.emit(StateEvent::FeedsChanged);
        if merged > 0 {
            self.emit(StateEvent::PostsChanged);
        }
        info!("Added feed '{}' with {} posts", url, merged);
        Ok(())
    }

    /// Run one refresh cycle over the current feed set.
    ///
    /// Every feed gets its own fetch+parse+merge pipeline; the pipelines
    /// run concurrently and the cycle completes only when all of them
    /// have settled. A failing pipeline is logged and contributes
    /// nothing; it cannot abort its siblings or the cycle.
    pub async fn refresh_all(&self) {
        let feeds = self.feeds().await;
        if feeds.is_empty() {
            return;
        }
        debug!("Refreshing {} feeds", feeds.len());

        let pipelines = feeds.into_iter().map(|feed| async move {
            match self.refresh_feed(&feed).await {
                Ok(0) => {}
                Ok(merged) => info!("Merged {} new posts from '{}'", merged, feed.link),
                Err(e) => error!("Failed to refresh feed '{}': {}", feed.link, e),
            }
        });
        join_all(pipelines).await;
    }

    /// Fetch, parse and merge a single feed. The merge dedupes against
    /// whatever is in state at merge time, including posts merged by
    /// sibling pipelines earlier in the same cycle.
    async fn refresh_feed(&self, feed: &Feed) -> Result<usize, FeedError> {
        let body = self.gateway.fetch_text(&feed.link).await?;
        let parsed = parser::parse(&body)?;

        let merged = self.state.write().await.merge_new_posts(parsed.posts);
        if merged > 0 {
            self.emit(StateEvent::PostsChanged);
        }
        Ok(merged)
    }

    /// Mark a post as the current selection, notifying subscribers.
    /// Returns the post for display; visited-state bookkeeping beyond
    /// the notification is the consumer's concern.
    pub async fn select_post(&self, id: PostId) -> Option<Post> {
        let post = self.state.read().await.post(id).cloned();
        if post.is_some() {
            self.emit(StateEvent::SelectionChanged(id));
        }
        post
    }
}
