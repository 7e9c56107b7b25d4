//! One-shot, non-interactive mode (`--json`).
//!
//! Runs a single load cycle into a [`Collector`] and prints the delivered
//! batch as one JSON document on stdout.

use std::io::{self, Write};

use anyhow::{bail, Result};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::source::{Item, PagingInfo, PlaceholderKind, StreamKind};
use crate::stream::{CellContent, Completion, StreamCellItem, StreamDestination, StreamGenerator};

/// A destination that just keeps what it is given.
#[derive(Debug, Default)]
pub struct Collector {
    pub placeholders: Vec<StreamCellItem>,
    pub items: Option<Vec<Item>>,
    pub paging: Option<PagingInfo>,
    pub paging_enabled: bool,
    pub not_found: bool,
}

impl StreamDestination for Collector {
    fn set_placeholders(&mut self, items: Vec<StreamCellItem>) {
        self.placeholders = items;
    }

    fn replace_placeholder(&mut self, _kind: PlaceholderKind, items: Vec<StreamCellItem>) {
        self.placeholders.clear();
        self.items = Some(
            items
                .into_iter()
                .filter_map(|cell| match cell.content {
                    CellContent::Item(item) => Some(item),
                    CellContent::Placeholder => None,
                })
                .collect(),
        );
    }

    fn set_paging_config(&mut self, paging: PagingInfo) {
        self.paging = Some(paging);
    }

    fn primary_fetch_not_found(&mut self) {
        self.placeholders.clear();
        self.not_found = true;
    }

    fn paging_enabled(&self) -> bool {
        self.paging_enabled
    }

    fn set_paging_enabled(&mut self, enabled: bool) {
        self.paging_enabled = enabled;
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    stream: StreamKind,
    paging: Option<&'a PagingInfo>,
    paging_enabled: bool,
    items: &'a [Item],
}

/// Drive one cycle to completion.
pub async fn collect(
    generator: &mut StreamGenerator,
    rx: &mut UnboundedReceiver<Completion>,
) -> Result<Collector> {
    let mut dest = Collector::default();
    generator.load(&mut dest, false)?;

    while generator.is_loading() {
        let Some(completion) = rx.recv().await else {
            bail!("completion channel closed before the stream finished loading");
        };
        generator.handle(&mut dest, completion)?;
    }
    Ok(dest)
}

/// Serialize a finished collection to `out`.
pub fn write_json(stream: StreamKind, collected: &Collector, out: &mut impl Write) -> Result<()> {
    if collected.not_found {
        bail!("{stream} stream not found");
    }
    let envelope = Envelope {
        stream,
        paging: collected.paging.as_ref(),
        paging_enabled: collected.paging_enabled,
        items: collected.items.as_deref().unwrap_or_default(),
    };
    serde_json::to_writer(&mut *out, &envelope)?;
    writeln!(out)?;
    Ok(())
}

pub async fn run(
    generator: &mut StreamGenerator,
    rx: &mut UnboundedReceiver<Completion>,
) -> Result<()> {
    let collected = collect(generator, rx).await?;
    write_json(generator.stream_kind(), &collected, &mut io::stdout().lock())
}
