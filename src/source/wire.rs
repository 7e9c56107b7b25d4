//! JSON shape of a stream page as served by the API.
//!
//! Decoding is two-stage: serde reads the page with its items left as raw
//! JSON, then [`into_items`] decodes each one into a loose [`RawItem`] and
//! keeps those whose `id` and `kind` are present, known and complete.  One
//! odd item never fails the page.

use serde::Deserialize;
use tracing::{debug, warn};

use super::{Item, ItemKind, PagingInfo, StreamPage};

#[derive(Debug, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(default)]
    pub paging: PagingInfo,
}

#[derive(Debug, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RawItem {
    fn into_item(self) -> Option<Item> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let kind = match self.kind?.as_str() {
            "post_stream" => ItemKind::PostStream { locator: self.stream_url },
            "post" => ItemKind::Post { post_id: self.post_id? },
            "external" => ItemKind::External { url: self.url? },
            "sponsored" => ItemKind::Sponsored { url: self.url },
            "invite" => ItemKind::Invite,
            "join" => ItemKind::Join,
            _ => return None,
        };
        let mut item = Item::new(id, kind);
        item.title = self.title;
        item.subtitle = self.subtitle;
        Some(item)
    }
}

/// Decode a page body.  Response order is kept.
pub fn decode_page(body: &[u8]) -> Result<StreamPage, serde_json::Error> {
    let raw: RawPage = serde_json::from_slice(body)?;
    Ok(StreamPage {
        items: into_items(raw.items),
        paging: raw.paging,
    })
}

fn into_items(raw: Vec<serde_json::Value>) -> Vec<Item> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let raw: RawItem = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(index, error = %e, "skipping undecodable item");
                    return None;
                }
            };
            let id = raw.id.clone().unwrap_or_default();
            let kind = raw.kind.clone().unwrap_or_default();
            let item = raw.into_item();
            if item.is_none() {
                match kind.as_str() {
                    "post_stream" | "post" | "external" | "sponsored" | "invite" | "join" => {
                        warn!(id = %id, kind = %kind, "skipping incomplete item")
                    }
                    "" => warn!(id = %id, "skipping item without kind"),
                    _ => debug!(id = %id, kind = %kind, "skipping unknown item kind"),
                }
            }
            item
        })
        .collect()
}
