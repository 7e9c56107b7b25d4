//! Fetch client abstraction layer.
//!
//! This module defines the [`FetchClient`] trait, the error it reports, and
//! the item types every client produces.  The only concrete client is the
//! HTTP one in [`http`].
//!
//! ## For contributors: adding a new client
//!
//! 1. Create a new file in this directory (e.g. `fixture.rs`).
//! 2. Define a struct and implement [`FetchClient`] for it.
//! 3. Add the module below and re-export your struct in the `pub use` block.
//! 4. Construct it in `main.rs` in place of (or next to) [`HttpClient`].
//!
//! The generator, the TUI and the headless printer are all client-agnostic.

mod http;
mod item;
mod post;
mod wire;

pub use http::HttpClient;
pub use item::{Item, ItemKind, PagingInfo, PlaceholderKind, StreamKind, StreamPage};
pub use post::Post;

use async_trait::async_trait;
use thiserror::Error;

/// Why a fetch produced no usable result.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered 404 for this resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server answered, but the body could not be decoded.
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    /// A post-stream locator that cannot be turned into a URL.
    #[error("invalid locator {0:?}")]
    InvalidLocator(String),

    /// The configured API base is not an absolute URL.
    #[error("invalid API base {0:?}")]
    InvalidBase(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl FetchError {
    /// True for the "not found / malformed" kind, as opposed to transport
    /// failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_) | FetchError::Malformed { .. })
    }
}

/// Everything the stream generator needs from the network.
///
/// Both calls are issued from tokio tasks, so implementations must be
/// [`Send`] + [`Sync`].  Timeouts and retries, if any, belong here; the
/// generator enforces none.
///
/// ## Implementing a new client
///
/// ```ignore
/// pub struct MyClient { /* config fields */ }
///
/// #[async_trait]
/// impl FetchClient for MyClient {
///     async fn load_stream(&self, kind: StreamKind) -> Result<StreamPage, FetchError> {
///         todo!()
///     }
///
///     async fn load_posts(&self, locator: &str) -> Result<Vec<Post>, FetchError> {
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Primary fetch: one page of `kind`, items in response order.
    async fn load_stream(&self, kind: StreamKind) -> Result<StreamPage, FetchError>;

    /// Enrichment fetch: the posts behind a post-stream locator.
    async fn load_posts(&self, locator: &str) -> Result<Vec<Post>, FetchError>;
}
