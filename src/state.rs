use std::collections::HashSet;
use std::fmt;

use crate::error::SubmitErrorKind;
use crate::parser::{FeedContent, PostContent};

/// Opaque feed identifier, unique within one process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedId(u64);

/// Opaque post identifier, unique within one process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostId(u64);

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feed-{}", self.0)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "post-{}", self.0)
    }
}

/// A tracked feed source. Created once on successful submission and
/// immutable afterwards; identity is `id`, `link` is the submitted URL.
#[derive(Debug, Clone)]
pub struct Feed {
    pub id: FeedId,
    pub title: String,
    pub description: String,
    pub link: String,
}

/// A discovered post. Never mutated or removed once created. Two posts
/// with the same `link` are the same post for deduplication purposes,
/// even though each observation would mint a distinct `id`.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub description: String,
    pub link: String,
}

/// Submission form lifecycle, as seen by event consumers.
///
/// `Filling` is the initial state; the engine emits `Sending` when a
/// submission passes validation, then `Finished` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Filling,
    Sending,
    Finished,
    Failed(SubmitErrorKind),
}

/// Typed change notifications broadcast by the engine. A presentation
/// layer subscribes to whichever subset it needs; the engine renders
/// nothing itself.
#[derive(Debug, Clone)]
pub enum StateEvent {
    FeedsChanged,
    PostsChanged,
    FormStateChanged(FormState),
    SelectionChanged(PostId),
}

/// Keep every candidate whose link is not already known, preserving the
/// candidates' relative order. Pure and total.
pub fn dedupe(known_links: &HashSet<String>, candidates: Vec<PostContent>) -> Vec<PostContent> {
    candidates
        .into_iter()
        .filter(|post| !known_links.contains(&post.link))
        .collect()
}

/// The shared aggregate the engine mutates and consumers observe.
///
/// `feeds` is append-only, newest submission last. `posts` keeps the
/// most-recently-discovered posts at the front. No two posts ever share
/// a link.
#[derive(Debug, Default)]
pub struct AppState {
    feeds: Vec<Feed>,
    posts: Vec<Post>,
    next_feed_id: u64,
    next_post_id: u64,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn has_feed_link(&self, link: &str) -> bool {
        self.feeds.iter().any(|feed| feed.link == link)
    }

    /// Mint a new feed record from parsed channel metadata and the URL it
    /// was fetched from.
    pub fn add_feed(&mut self, content: FeedContent, link: impl Into<String>) -> FeedId {
        let id = FeedId(self.next_feed_id);
        self.next_feed_id += 1;
        self.feeds.push(Feed {
            id,
            title: content.title,
            description: content.description,
            link: link.into(),
        });
        id
    }

    /// The full set of post links currently in state.
    pub fn known_links(&self) -> HashSet<String> {
        self.posts.iter().map(|post| post.link.clone()).collect()
    }

    /// Merge freshly parsed posts, dropping every link already in state
    /// and splicing the rest at the front as one batch. Returns how many
    /// posts landed.
    ///
    /// Links are also deduplicated within the batch itself, so a document
    /// that repeats a link cannot break the uniqueness of `posts`.
    pub fn merge_new_posts(&mut self, candidates: Vec<PostContent>) -> usize {
        let known = self.known_links();
        let fresh = dedupe(&known, candidates);

        let mut batch_links = HashSet::new();
        let mut minted = Vec::with_capacity(fresh.len());
        for content in fresh {
            if !batch_links.insert(content.link.clone()) {
                continue;
            }
            let id = PostId(self.next_post_id);
            self.next_post_id += 1;
            minted.push(Post {
                id,
                title: content.title,
                description: content.description,
                link: content.link,
            });
        }

        let count = minted.len();
        self.posts.splice(0..0, minted);
        count
    }
}
