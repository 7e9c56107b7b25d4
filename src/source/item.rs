//! Stream items and the page metadata that travels with them.
//!
//! Every [`FetchClient`](super::FetchClient) converts its wire format into
//! these types so that the generator and the destinations never see the
//! backend's schema.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::Post;

/// Which stream a generator loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Curated editorials; post-stream editorials need enrichment.
    Editorials,
    /// The signed-in user's following stream.
    Following,
}

impl StreamKind {
    /// Endpoint path relative to the API base.
    pub fn path(self) -> &'static str {
        match self {
            StreamKind::Editorials => "editorials",
            StreamKind::Following => "following/posts/recent",
        }
    }

    /// The placeholder section this stream's items replace.
    pub fn placeholder(self) -> PlaceholderKind {
        match self {
            StreamKind::Editorials => PlaceholderKind::Editorials,
            StreamKind::Following => PlaceholderKind::StreamPosts,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Editorials => f.write_str("editorials"),
            StreamKind::Following => f.write_str("following"),
        }
    }
}

/// Section tag shared by a placeholder cell and the items that replace it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    Editorials,
    StreamPosts,
}

/// The polymorphic part of an item.
///
/// Only [`ItemKind::PostStream`] carries a locator that needs a follow-up
/// fetch; everything else is complete as delivered by the primary fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    /// Points at a stream of posts that must be fetched separately.
    PostStream { locator: Option<String> },
    /// A single post, already complete.
    Post { post_id: String },
    /// A link out of the network.
    External { url: String },
    /// Sponsored content ("ad").
    Sponsored { url: Option<String> },
    /// Invite-your-friends prompt.
    Invite,
    /// Join prompt shown to signed-out users.
    Join,
}

impl ItemKind {
    /// Short label used in logs and the list view.
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::PostStream { .. } => "post-stream",
            ItemKind::Post { .. } => "post",
            ItemKind::External { .. } => "external",
            ItemKind::Sponsored { .. } => "ad",
            ItemKind::Invite => "invite",
            ItemKind::Join => "join",
        }
    }
}

/// One content unit of a stream page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Stable id from the stream response.
    pub id: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(flatten)]
    pub kind: ItemKind,
    /// Enrichment payload.  `None` until a follow-up fetch fills it, and
    /// still `None` after delivery if that fetch failed.
    pub posts: Option<Vec<Post>>,
}

impl Item {
    pub fn new(id: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            title: None,
            subtitle: None,
            kind,
            posts: None,
        }
    }

    /// The locator of the follow-up fetch this item needs, if any.
    pub fn enrichment_locator(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::PostStream { locator: Some(locator) } if !locator.trim().is_empty() => {
                Some(locator.as_str())
            }
            _ => None,
        }
    }
}

/// Pagination links reported with a stream page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingInfo {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

impl PagingInfo {
    pub fn is_last_page(&self) -> bool {
        self.next.is_none()
    }
}

/// Result of one primary fetch: items in response order plus paging.
#[derive(Debug, Clone, Default)]
pub struct StreamPage {
    pub items: Vec<Item>,
    pub paging: PagingInfo,
}
