use ratatui::widgets::ListState;

use crate::source::{PagingInfo, PlaceholderKind};
use crate::stream::{StreamCellItem, StreamDestination};

pub struct App {
    /// Rows in display order: placeholders until a batch replaces them.
    pub cells: Vec<StreamCellItem>,
    /// Paging links from the last successful primary fetch.
    pub paging: Option<PagingInfo>,
    pub paging_enabled: bool,
    /// Set when the primary fetch failed; cleared by the next load.
    pub not_found: bool,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Whether the user has asked for a reload since the last tick.
    pub reload_requested: bool,
    /// Last load status message.
    pub status: String,
}

impl App {
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            paging: None,
            paging_enabled: false,
            not_found: false,
            list_state: ListState::default(),
            quit: false,
            reload_requested: false,
            status: "Starting…".into(),
        }
    }

    /// Number of delivered items on screen (placeholders excluded).
    pub fn item_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_placeholder()).count()
    }

    /// Keep the selection inside the list after the rows change.
    fn clamp_selection(&mut self) {
        match (self.list_state.selected(), self.cells.len()) {
            (_, 0) => self.list_state.select(None),
            (Some(i), len) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.cells.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.cells.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.cells.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.cells.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.cells.is_empty() {
            self.list_state.select(Some(self.cells.len() - 1));
        }
    }
}

impl StreamDestination for App {
    fn set_placeholders(&mut self, items: Vec<StreamCellItem>) {
        self.cells = items;
        self.not_found = false;
        self.status = "Loading…".into();
        self.list_state.select(None);
    }

    fn replace_placeholder(&mut self, kind: PlaceholderKind, items: Vec<StreamCellItem>) {
        let at = self
            .cells
            .iter()
            .position(|c| c.section == kind)
            .unwrap_or(self.cells.len());
        self.cells.retain(|c| c.section != kind);
        let at = at.min(self.cells.len());
        let count = items.len();
        self.cells.splice(at..at, items);

        self.not_found = false;
        self.status = format!("Loaded {count} items");
        self.clamp_selection();
    }

    fn set_paging_config(&mut self, paging: PagingInfo) {
        self.paging = Some(paging);
    }

    fn primary_fetch_not_found(&mut self) {
        self.cells.clear();
        self.not_found = true;
        self.status = "Stream not found".into();
        self.clamp_selection();
    }

    fn paging_enabled(&self) -> bool {
        self.paging_enabled
    }

    fn set_paging_enabled(&mut self, enabled: bool) {
        self.paging_enabled = enabled;
    }
}
