//! Incremental stream loading.
//!
//! A [`StreamGenerator`] turns one `load` call into a placeholder, a
//! primary fetch, a dynamic fan-out of enrichment fetches counted on a
//! [`Latch`], and finally one ordered batch handed to a
//! [`StreamDestination`].
//!
//! ```text
//!  load() ──► placeholders ──► primary fetch ──► N enrichment fetches
//!                                   │                   │
//!                                   └──── Latch (1 + N) ┘
//!                                              │ finalize
//!                                              ▼
//!                                   replace_placeholder(batch)
//! ```

mod generator;
mod latch;
mod token;

pub use generator::{Completion, StreamGenerator};
pub use latch::{Latch, LatchError, Progress, Unit};
pub use token::{CycleId, LoadingToken};

#[cfg(test)]
pub(crate) use generator::tests as generator_fixtures;

use serde::Serialize;

use crate::source::{Item, PagingInfo, PlaceholderKind};

/// What a list row shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellContent {
    /// Loading indicator for the section.
    Placeholder,
    Item(Item),
}

/// One row handed to a destination, tagged with the section it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamCellItem {
    pub section: PlaceholderKind,
    pub content: CellContent,
}

impl StreamCellItem {
    pub fn placeholder(section: PlaceholderKind) -> Self {
        Self {
            section,
            content: CellContent::Placeholder,
        }
    }

    pub fn item(section: PlaceholderKind, item: Item) -> Self {
        Self {
            section,
            content: CellContent::Item(item),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.content, CellContent::Placeholder)
    }

    pub fn as_item(&self) -> Option<&Item> {
        match &self.content {
            CellContent::Item(item) => Some(item),
            CellContent::Placeholder => None,
        }
    }
}

/// The consumer of a generator's output.
///
/// Per load cycle a destination sees, in order: `set_placeholders` (unless
/// reloading), `set_paging_config` once the primary fetch succeeds, then
/// either `replace_placeholder` followed by `set_paging_enabled`, or
/// `primary_fetch_not_found`.  Superseded cycles produce nothing after the
/// point they were superseded.
pub trait StreamDestination {
    fn set_placeholders(&mut self, items: Vec<StreamCellItem>);

    /// Swap the cells of section `kind` for `items`.
    fn replace_placeholder(&mut self, kind: PlaceholderKind, items: Vec<StreamCellItem>);

    fn set_paging_config(&mut self, paging: PagingInfo);

    fn primary_fetch_not_found(&mut self);

    fn paging_enabled(&self) -> bool;

    fn set_paging_enabled(&mut self, enabled: bool);
}
