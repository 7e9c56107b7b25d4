//! The stream generator: one load cycle at a time, results funnelled back
//! to a single owner.
//!
//! Fetches run as tokio tasks.  Each task reports through one
//! [`Completion`] message on an unbounded channel, and the owner feeds
//! those messages to [`StreamGenerator::handle`] on its own thread, the way
//! the TUI loop drains its poll messages.  All cycle state (latch, items)
//! is therefore touched from one place only.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, info_span, warn};

use super::{CycleId, Latch, LatchError, LoadingToken, Progress, StreamCellItem, StreamDestination, Unit};
use crate::source::{FetchClient, FetchError, Item, Post, StreamKind, StreamPage};

/// A finished fetch, on its way back to the owning generator.
#[derive(Debug)]
pub enum Completion {
    Primary {
        cycle: CycleId,
        unit: Unit,
        result: Result<StreamPage, FetchError>,
    },
    Enrichment {
        cycle: CycleId,
        /// Index of the item in the cycle's batch.
        slot: usize,
        unit: Unit,
        result: Result<Vec<Post>, FetchError>,
    },
}

impl Completion {
    pub fn cycle(&self) -> CycleId {
        match self {
            Completion::Primary { cycle, .. } | Completion::Enrichment { cycle, .. } => *cycle,
        }
    }
}

/// State owned by the current load cycle.  Replaced wholesale, never reused.
struct LoadCycle {
    id: CycleId,
    latch: Latch,
    items: Vec<Item>,
}

/// Spawns fetch tasks and routes their results into the channel.
struct Dispatcher {
    client: Arc<dyn FetchClient>,
    runtime: Handle,
    tx: UnboundedSender<Completion>,
}

impl Dispatcher {
    fn primary(&self, cycle: CycleId, unit: Unit, kind: StreamKind) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = client.load_stream(kind).await;
            // A closed channel means the owner is gone; nothing to report to.
            let _ = tx.send(Completion::Primary { cycle, unit, result });
        });
    }

    fn enrichment(&self, cycle: CycleId, slot: usize, unit: Unit, locator: String) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = client.load_posts(&locator).await;
            if let Err(e) = &result {
                debug!(cycle = %cycle, slot, locator = %locator, error = %e, "enrichment fetch failed");
            }
            let _ = tx.send(Completion::Enrichment { cycle, slot, unit, result });
        });
    }
}

/// Loads one [`StreamKind`] into a [`StreamDestination`].
pub struct StreamGenerator {
    stream_kind: StreamKind,
    dispatcher: Dispatcher,
    token: LoadingToken,
    cycle: Option<LoadCycle>,
}

impl StreamGenerator {
    /// Create a generator whose fetches run on `runtime`.
    ///
    /// Returns the receiver the owner must drain into [`handle`](Self::handle).
    pub fn new(
        stream_kind: StreamKind,
        client: Arc<dyn FetchClient>,
        runtime: Handle,
    ) -> (Self, UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let generator = Self {
            stream_kind,
            dispatcher: Dispatcher { client, runtime, tx },
            token: LoadingToken::new(),
            cycle: None,
        };
        (generator, rx)
    }

    pub fn stream_kind(&self) -> StreamKind {
        self.stream_kind
    }

    /// True while a cycle has been started but not yet delivered or failed.
    pub fn is_loading(&self) -> bool {
        self.cycle.is_some()
    }

    /// Start a new load cycle, superseding any in-flight one.
    ///
    /// Without `reload` the destination first gets a placeholder for this
    /// stream; a reload keeps whatever is on screen until the new batch
    /// lands.
    pub fn load(&mut self, dest: &mut dyn StreamDestination, reload: bool) -> Result<(), LatchError> {
        let id = self.token.reset_initial_page_loading_token();
        if !reload {
            dest.set_placeholders(vec![StreamCellItem::placeholder(self.stream_kind.placeholder())]);
        }

        let mut latch = Latch::new();
        let unit = latch.register()?;
        let previous = self.cycle.replace(LoadCycle {
            id,
            latch,
            items: Vec::new(),
        });
        if let Some(previous) = previous {
            debug!(superseded = %previous.id, cycle = %id, "superseding in-flight load cycle");
        }

        info!(cycle = %id, stream = %self.stream_kind, reload, "load cycle started");
        self.dispatcher.primary(id, unit, self.stream_kind);
        Ok(())
    }

    /// Drop the in-flight cycle, if any.  Its completions will be ignored.
    pub fn cancel(&mut self) {
        self.token.cancel();
        if let Some(cycle) = self.cycle.take() {
            debug!(cycle = %cycle.id, "load cycle cancelled");
        }
    }

    /// Apply one completion.  Completions from superseded cycles are
    /// discarded without touching the destination.
    pub fn handle(&mut self, dest: &mut dyn StreamDestination, completion: Completion) -> Result<(), LatchError> {
        let id = completion.cycle();
        if !self.token.is_valid(id) || self.cycle.as_ref().map(|c| c.id) != Some(id) {
            debug!(cycle = %id, "discarding completion from stale load cycle");
            return Ok(());
        }

        let _span = info_span!("load_cycle", cycle = %id, stream = %self.stream_kind).entered();
        match completion {
            Completion::Primary { unit, result, .. } => self.on_primary(dest, unit, result),
            Completion::Enrichment { slot, unit, result, .. } => self.on_enrichment(dest, slot, unit, result),
        }
    }

    fn on_primary(
        &mut self,
        dest: &mut dyn StreamDestination,
        unit: Unit,
        result: Result<StreamPage, FetchError>,
    ) -> Result<(), LatchError> {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, not_found = e.is_not_found(), "primary fetch failed");
                self.cycle = None;
                dest.primary_fetch_not_found();
                return Ok(());
            }
        };

        let Some(cycle) = self.cycle.as_mut() else {
            return Ok(());
        };

        dest.set_paging_config(page.paging);
        cycle.items = parse(page.items);

        debug_assert!(!cycle.latch.is_closed());
        for (slot, item) in cycle.items.iter().enumerate() {
            if let Some(locator) = item.enrichment_locator() {
                let enrichment = cycle.latch.register()?;
                self.dispatcher.enrichment(cycle.id, slot, enrichment, locator.to_string());
            }
        }
        // The primary fetch holds one of the registrations.
        debug!(
            items = cycle.items.len(),
            enrichments = cycle.latch.registered() - 1,
            "primary fetch parsed"
        );

        cycle.latch.signal(unit)?;
        if cycle.latch.close()? == Progress::Finalized {
            self.deliver(dest);
        }
        Ok(())
    }

    fn on_enrichment(
        &mut self,
        dest: &mut dyn StreamDestination,
        slot: usize,
        unit: Unit,
        result: Result<Vec<Post>, FetchError>,
    ) -> Result<(), LatchError> {
        let Some(cycle) = self.cycle.as_mut() else {
            return Ok(());
        };

        match (result, cycle.items.get_mut(slot)) {
            (Ok(posts), Some(item)) => item.posts = Some(posts),
            (Ok(_), None) => warn!(slot, "enrichment for unknown slot"),
            (Err(e), item) => warn!(
                slot,
                item = item.map(|i| i.id.as_str()).unwrap_or_default(),
                error = %e,
                "enrichment failed; delivering item without posts"
            ),
        }

        let progress = cycle.latch.signal(unit)?;
        debug!(done = cycle.latch.completed(), of = cycle.latch.registered(), "enrichment applied");
        if progress == Progress::Finalized {
            self.deliver(dest);
        }
        Ok(())
    }

    fn deliver(&mut self, dest: &mut dyn StreamDestination) {
        let Some(cycle) = self.cycle.take() else {
            return;
        };
        debug_assert!(cycle.latch.is_finalized());
        let section = self.stream_kind.placeholder();
        let cells: Vec<StreamCellItem> = cycle
            .items
            .into_iter()
            .map(|item| StreamCellItem::item(section, item))
            .collect();
        let enabled = !cells.is_empty();

        info!(cycle = %cycle.id, items = cells.len(), "delivering batch");
        dest.replace_placeholder(section, cells);
        dest.set_paging_enabled(enabled);
    }
}

/// Keep the first item for each id, in response order.
pub fn parse(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let fresh = seen.insert(item.id.clone());
            if !fresh {
                debug!(id = %item.id, "dropping duplicate item");
            }
            fresh
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::source::{ItemKind, PagingInfo, PlaceholderKind};
    use crate::stream::CellContent;

    /// Scripted in-memory client.  `None` answers mean "not found", as do
    /// the first `failing_primaries` calls to `load_stream`.
    #[derive(Default)]
    pub struct FakeClient {
        pub page: Option<Vec<Item>>,
        pub paging: PagingInfo,
        pub posts: HashMap<String, Option<Vec<Post>>>,
        pub failing_primaries: usize,
        pub primary_calls: AtomicUsize,
    }

    #[async_trait]
    impl FetchClient for FakeClient {
        async fn load_stream(&self, kind: StreamKind) -> Result<StreamPage, FetchError> {
            let call = self.primary_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failing_primaries {
                return Err(FetchError::NotFound(kind.path().to_string()));
            }
            match &self.page {
                Some(items) => Ok(StreamPage { items: items.clone(), paging: self.paging.clone() }),
                None => Err(FetchError::NotFound(kind.path().to_string())),
            }
        }

        async fn load_posts(&self, locator: &str) -> Result<Vec<Post>, FetchError> {
            match self.posts.get(locator) {
                Some(Some(posts)) => Ok(posts.clone()),
                _ => Err(FetchError::NotFound(locator.to_string())),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum Event {
        Placeholders(Vec<StreamCellItem>),
        Replaced(PlaceholderKind, Vec<StreamCellItem>),
        Paging(PagingInfo),
        NotFound,
        PagingEnabled(bool),
    }

    /// Destination that remembers every call.
    #[derive(Default)]
    pub struct Recorder {
        pub events: Vec<Event>,
        pub paging_enabled: bool,
    }

    impl Recorder {
        pub fn batches(&self) -> Vec<&Vec<StreamCellItem>> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Replaced(_, cells) => Some(cells),
                    _ => None,
                })
                .collect()
        }
    }

    impl StreamDestination for Recorder {
        fn set_placeholders(&mut self, items: Vec<StreamCellItem>) {
            self.events.push(Event::Placeholders(items));
        }

        fn replace_placeholder(&mut self, kind: PlaceholderKind, items: Vec<StreamCellItem>) {
            self.events.push(Event::Replaced(kind, items));
        }

        fn set_paging_config(&mut self, paging: PagingInfo) {
            self.events.push(Event::Paging(paging));
        }

        fn primary_fetch_not_found(&mut self) {
            self.events.push(Event::NotFound);
        }

        fn paging_enabled(&self) -> bool {
            self.paging_enabled
        }

        fn set_paging_enabled(&mut self, enabled: bool) {
            self.paging_enabled = enabled;
            self.events.push(Event::PagingEnabled(enabled));
        }
    }

    pub fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            title: format!("post {id}"),
            summary: None,
            link: None,
            published: None,
            author: None,
        }
    }

    pub fn post_stream(id: &str, locator: &str) -> Item {
        Item::new(id, ItemKind::PostStream { locator: Some(locator.to_string()) })
    }

    pub fn external(id: &str) -> Item {
        Item::new(id, ItemKind::External { url: format!("https://example.com/{id}") })
    }

    /// Three items, two of them enrichable, all enrichments succeed.
    pub fn editorials_client() -> FakeClient {
        FakeClient {
            page: Some(vec![
                post_stream("e1", "/streams/a"),
                external("e2"),
                post_stream("e3", "/streams/b"),
            ]),
            paging: PagingInfo { next: Some("/editorials?before=e3".into()), ..Default::default() },
            posts: HashMap::from([
                ("/streams/a".to_string(), Some(vec![post("a1"), post("a2")])),
                ("/streams/b".to_string(), Some(vec![post("b1")])),
            ]),
            ..Default::default()
        }
    }

    fn generator(client: FakeClient) -> (StreamGenerator, UnboundedReceiver<Completion>) {
        StreamGenerator::new(StreamKind::Editorials, Arc::new(client), Handle::current())
    }

    async fn recv(rx: &mut UnboundedReceiver<Completion>, n: usize) -> Vec<Completion> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(rx.recv().await.expect("completion channel closed"));
        }
        out
    }

    fn delivered_items(cells: &[StreamCellItem]) -> Vec<&Item> {
        cells.iter().filter_map(StreamCellItem::as_item).collect()
    }

    fn ids(cells: &[StreamCellItem]) -> Vec<&str> {
        delivered_items(cells).iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn delivers_enriched_batch_in_response_order() {
        let (mut gen, mut rx) = generator(editorials_client());
        let mut dest = Recorder::default();

        gen.load(&mut dest, false).unwrap();
        assert!(matches!(&dest.events[0], Event::Placeholders(cells) if cells.len() == 1 && cells[0].is_placeholder()));

        for c in recv(&mut rx, 1).await {
            gen.handle(&mut dest, c).unwrap();
        }
        assert!(dest.batches().is_empty(), "batch waits for enrichments");
        assert!(gen.is_loading());

        for c in recv(&mut rx, 2).await {
            gen.handle(&mut dest, c).unwrap();
        }

        let batches = dest.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(ids(batches[0]), ["e1", "e2", "e3"]);

        let items = delivered_items(batches[0]);
        assert_eq!(items[0].posts.as_ref().map(Vec::len), Some(2));
        assert_eq!(items[1].posts, None, "external items are not enriched");
        assert_eq!(items[2].posts.as_ref().map(Vec::len), Some(1));

        assert!(dest.paging_enabled);
        assert!(!gen.is_loading());
        assert_eq!(dest.events.last(), Some(&Event::PagingEnabled(true)));
    }

    #[tokio::test]
    async fn paging_config_precedes_delivery() {
        let (mut gen, mut rx) = generator(editorials_client());
        let mut dest = Recorder::default();

        gen.load(&mut dest, false).unwrap();
        for c in recv(&mut rx, 1).await {
            gen.handle(&mut dest, c).unwrap();
        }
        for c in recv(&mut rx, 2).await {
            gen.handle(&mut dest, c).unwrap();
        }

        let paging_at = dest.events.iter().position(|e| matches!(e, Event::Paging(_))).unwrap();
        let replaced_at = dest.events.iter().position(|e| matches!(e, Event::Replaced(..))).unwrap();
        assert!(paging_at < replaced_at);
        assert!(matches!(&dest.events[paging_at], Event::Paging(p) if !p.is_last_page()));
    }

    #[tokio::test]
    async fn order_survives_every_enrichment_interleaving() {
        let permutations: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        for order in permutations {
            let client = FakeClient {
                page: Some(vec![
                    post_stream("x", "/x"),
                    post_stream("y", "/y"),
                    post_stream("z", "/z"),
                ]),
                posts: HashMap::from([
                    ("/x".to_string(), Some(vec![post("x1")])),
                    ("/y".to_string(), Some(vec![post("y1")])),
                    ("/z".to_string(), Some(vec![post("z1")])),
                ]),
                ..Default::default()
            };
            let (mut gen, mut rx) = generator(client);
            let mut dest = Recorder::default();

            gen.load(&mut dest, false).unwrap();
            for c in recv(&mut rx, 1).await {
                gen.handle(&mut dest, c).unwrap();
            }

            let mut pending: Vec<Option<Completion>> = recv(&mut rx, 3).await.into_iter().map(Some).collect();
            for i in order {
                let c = pending[i].take().unwrap();
                gen.handle(&mut dest, c).unwrap();
            }

            let batches = dest.batches();
            assert_eq!(batches.len(), 1, "order {order:?}");
            assert_eq!(ids(batches[0]), ["x", "y", "z"], "order {order:?}");
            let first_posts: Vec<&str> = delivered_items(batches[0])
                .iter()
                .map(|i| i.posts.as_ref().unwrap()[0].id.as_str())
                .collect();
            assert_eq!(first_posts, ["x1", "y1", "z1"], "payloads land in their own slots");
        }
    }

    #[tokio::test]
    async fn failed_enrichment_still_delivers_item_without_posts() {
        let mut client = editorials_client();
        client.posts.insert("/streams/b".to_string(), None);
        let (mut gen, mut rx) = generator(client);
        let mut dest = Recorder::default();

        gen.load(&mut dest, false).unwrap();
        for c in recv(&mut rx, 1).await {
            gen.handle(&mut dest, c).unwrap();
        }
        for c in recv(&mut rx, 2).await {
            gen.handle(&mut dest, c).unwrap();
        }

        let batches = dest.batches();
        assert_eq!(batches.len(), 1);
        let items = delivered_items(batches[0]);
        assert_eq!(items.len(), 3);
        assert!(items[0].posts.is_some());
        assert!(items[2].posts.is_none());
        assert!(dest.paging_enabled);
    }

    #[tokio::test]
    async fn empty_page_delivers_empty_batch_and_disables_paging() {
        let client = FakeClient { page: Some(Vec::new()), ..Default::default() };
        let (mut gen, mut rx) = generator(client);
        let mut dest = Recorder { paging_enabled: true, ..Default::default() };

        gen.load(&mut dest, false).unwrap();
        for c in recv(&mut rx, 1).await {
            gen.handle(&mut dest, c).unwrap();
        }

        let batches = dest.batches();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_empty());
        assert!(!dest.paging_enabled);
    }

    #[tokio::test]
    async fn primary_failure_reports_not_found_and_never_delivers() {
        let (mut gen, mut rx) = generator(FakeClient::default());
        let mut dest = Recorder::default();

        gen.load(&mut dest, false).unwrap();
        for c in recv(&mut rx, 1).await {
            gen.handle(&mut dest, c).unwrap();
        }

        assert!(dest.events.contains(&Event::NotFound));
        assert!(dest.batches().is_empty());
        assert!(!dest.events.iter().any(|e| matches!(e, Event::PagingEnabled(_) | Event::Paging(_))));
        assert!(!gen.is_loading());
    }

    #[tokio::test]
    async fn second_load_supersedes_first() {
        let (mut gen, mut rx) = generator(editorials_client());
        let mut dest = Recorder::default();

        gen.load(&mut dest, false).unwrap();
        gen.load(&mut dest, false).unwrap();

        let primaries = recv(&mut rx, 2).await;
        let cycles: Vec<CycleId> = primaries.iter().map(Completion::cycle).collect();
        assert_ne!(cycles[0], cycles[1]);
        for c in primaries {
            gen.handle(&mut dest, c).unwrap();
        }

        // Only the live cycle fanned out.
        for c in recv(&mut rx, 2).await {
            assert_eq!(c.cycle(), cycles[1]);
            gen.handle(&mut dest, c).unwrap();
        }

        assert_eq!(dest.batches().len(), 1);
        assert_eq!(dest.events.iter().filter(|e| matches!(e, Event::Paging(_))).count(), 1);
        assert!(rx.try_recv().is_err(), "no stray completions");
    }

    #[tokio::test]
    async fn superseded_primary_failure_is_ignored() {
        let client = FakeClient { failing_primaries: 1, ..editorials_client() };
        let (mut gen, mut rx) = generator(client);
        let mut dest = Recorder::default();

        gen.load(&mut dest, false).unwrap();
        gen.load(&mut dest, true).unwrap();

        let primaries = recv(&mut rx, 2).await;
        let stale = primaries.iter().position(|c| matches!(c, Completion::Primary { result: Err(_), .. }));
        assert_eq!(stale, Some(0), "the first cycle's primary is the one that failed");
        for c in primaries {
            gen.handle(&mut dest, c).unwrap();
        }
        for c in recv(&mut rx, 2).await {
            gen.handle(&mut dest, c).unwrap();
        }

        assert!(!dest.events.contains(&Event::NotFound));
        assert_eq!(dest.batches().len(), 1);
        assert_eq!(ids(dest.batches()[0]), ["e1", "e2", "e3"]);
    }

    #[tokio::test]
    async fn reload_mid_enrichment_discards_old_cycle() {
        let (mut gen, mut rx) = generator(editorials_client());
        let mut dest = Recorder::default();

        gen.load(&mut dest, false).unwrap();
        for c in recv(&mut rx, 1).await {
            gen.handle(&mut dest, c).unwrap();
        }
        let stale = recv(&mut rx, 2).await;

        gen.load(&mut dest, true).unwrap();
        let placeholders = dest.events.iter().filter(|e| matches!(e, Event::Placeholders(_))).count();
        assert_eq!(placeholders, 1, "reload does not re-emit placeholders");

        for c in stale {
            gen.handle(&mut dest, c).unwrap();
        }
        assert!(dest.batches().is_empty(), "stale enrichments never deliver");

        for c in recv(&mut rx, 1).await {
            gen.handle(&mut dest, c).unwrap();
        }
        for c in recv(&mut rx, 2).await {
            gen.handle(&mut dest, c).unwrap();
        }
        assert_eq!(dest.batches().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_cycle_delivers_nothing() {
        let (mut gen, mut rx) = generator(editorials_client());
        let mut dest = Recorder::default();

        gen.load(&mut dest, false).unwrap();
        gen.cancel();
        assert!(!gen.is_loading());

        for c in recv(&mut rx, 1).await {
            gen.handle(&mut dest, c).unwrap();
        }
        assert_eq!(dest.events.len(), 1, "only the placeholder was ever emitted");
    }

    #[tokio::test]
    async fn duplicate_ids_are_delivered_once() {
        let client = FakeClient {
            page: Some(vec![external("a"), external("b"), external("a")]),
            ..Default::default()
        };
        let (mut gen, mut rx) = generator(client);
        let mut dest = Recorder::default();

        gen.load(&mut dest, false).unwrap();
        for c in recv(&mut rx, 1).await {
            gen.handle(&mut dest, c).unwrap();
        }

        assert_eq!(ids(dest.batches()[0]), ["a", "b"]);
    }

    #[tokio::test]
    async fn delivered_cells_belong_to_stream_section() {
        let (mut gen, mut rx) = generator(editorials_client());
        let mut dest = Recorder::default();

        gen.load(&mut dest, false).unwrap();
        for c in recv(&mut rx, 1).await {
            gen.handle(&mut dest, c).unwrap();
        }
        for c in recv(&mut rx, 2).await {
            gen.handle(&mut dest, c).unwrap();
        }

        let (kind, cells) = dest
            .events
            .iter()
            .find_map(|e| match e {
                Event::Replaced(kind, cells) => Some((*kind, cells)),
                _ => None,
            })
            .unwrap();
        assert_eq!(kind, PlaceholderKind::Editorials);
        assert!(cells.iter().all(|c| c.section == kind && matches!(c.content, CellContent::Item(_))));
    }

    #[test]
    fn parse_keeps_first_occurrence_order() {
        let items = parse(vec![external("b"), external("a"), external("b"), external("c")]);
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }
}
