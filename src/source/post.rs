//! The enrichment payload of a post-stream item.
//!
//! A `Post` is one entry of the stream a post-stream item points at.  The
//! HTTP client builds them from the RSS channel behind the item's locator;
//! tests build them by hand.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single post inside an enriched post stream.
///
/// ## Sorting
///
/// [`Post::newest_first`] gives **reverse-chronological** ordering: newer
/// posts sort before older ones, and undated posts sort last.  It is a
/// comparator over `published` only, not an [`Ord`] impl, because two
/// different posts may share a timestamp.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Post {
    /// Unique identifier used for de-duplication.
    ///
    /// For RSS this is the `<guid>` element (falling back to `<link>`).
    pub id: String,

    /// Human-readable headline.
    pub title: String,

    /// Optional longer summary text.
    pub summary: Option<String>,

    /// URL to the full post.
    pub link: Option<String>,

    /// Publication timestamp, used for sorting.
    pub published: Option<DateTime<Utc>>,

    /// Author as reported by the stream, if any.
    pub author: Option<String>,
}

impl Post {
    pub fn newest_first(&self, other: &Self) -> Ordering {
        // `other` first so that `Some(newer) > Some(older)` gives us newest-first.
        // `None` is less than `Some(_)`, so undated posts sink to the bottom.
        other.published.cmp(&self.published)
    }
}

/// Drop repeated ids (first occurrence wins), then sort newest first.
///
/// The sort is stable, so posts with equal timestamps keep stream order.
pub fn normalize(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    let mut posts: Vec<Post> = posts
        .into_iter()
        .filter(|post| seen.insert(post.id.clone()))
        .collect();
    posts.sort_by(Post::newest_first);
    posts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
