//! HTTP fetch client.
//!
//! Primary fetches read a JSON stream page from `<api base>/<stream path>`.
//! Enrichment fetches resolve a post-stream locator against the same base
//! and parse the RSS 2.0 channel found there into [`Post`]s.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use super::{post, wire, FetchClient, FetchError, Post, StreamKind, StreamPage};

/// A [`FetchClient`] backed by a shared [`reqwest::Client`].
pub struct HttpClient {
    client: Client,
    /// API root; always ends in `/` so that [`Url::join`] appends.
    base: Url,
}

impl HttpClient {
    /// Create a client for the API rooted at `base`.
    ///
    /// `timeout` bounds every request this client makes.
    pub fn new(base: &str, timeout: Duration) -> Result<Self, FetchError> {
        let mut base = Url::parse(base).map_err(|_| FetchError::InvalidBase(base.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base })
    }

    /// Turn a locator (absolute URL or path relative to the API base) into
    /// a request URL.
    pub fn resolve(&self, locator: &str) -> Result<Url, FetchError> {
        self.base
            .join(locator.trim())
            .map_err(|_| FetchError::InvalidLocator(locator.to_string()))
    }

    async fn get(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        let body = response.error_for_status()?.bytes().await?;
        Ok(body.to_vec())
    }

    /// Parse an already-fetched [`rss::Channel`] into [`Post`]s.
    ///
    /// This is a pure function (no I/O) so that tests can exercise the
    /// parsing logic without hitting the network.
    pub fn parse_channel(channel: &rss::Channel) -> Vec<Post> {
        let posts = channel
            .items()
            .iter()
            .map(|item| {
                // Prefer <guid>, fall back to <link>, then empty string.
                let id = item
                    .guid()
                    .map(|g| g.value().to_string())
                    .or_else(|| item.link().map(String::from))
                    .unwrap_or_default();

                // Parse RFC-2822 date; gracefully degrade to None on failure.
                let published = item
                    .pub_date()
                    .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                    .map(|dt| dt.with_timezone(&Utc));

                Post {
                    id,
                    title: item.title().unwrap_or("(untitled)").to_string(),
                    summary: item.description().map(String::from),
                    link: item.link().map(String::from),
                    published,
                    author: item.author().map(String::from),
                }
            })
            .collect();
        post::normalize(posts)
    }
}

#[async_trait]
impl FetchClient for HttpClient {
    async fn load_stream(&self, kind: StreamKind) -> Result<StreamPage, FetchError> {
        let url = self.resolve(kind.path())?;
        let body = self.get(&url).await?;
        wire::decode_page(&body).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn load_posts(&self, locator: &str) -> Result<Vec<Post>, FetchError> {
        let url = self.resolve(locator)?;
        let body = self.get(&url).await?;
        let channel = rss::Channel::read_from(body.as_slice()).map_err(|e| {
            FetchError::Malformed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::parse_channel(&channel))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
