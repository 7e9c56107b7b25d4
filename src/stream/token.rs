//! Load-cycle identity.
//!
//! In-flight I/O is never cancelled.  Instead every completion carries the
//! [`CycleId`] it was issued under, and the owner drops it unless that id
//! is still current.

use std::fmt;

/// Identifies one load cycle of one generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CycleId(u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-generator source of [`CycleId`]s.  Only the most recently issued id
/// is valid.
#[derive(Debug, Default)]
pub struct LoadingToken {
    current: u64,
}

impl LoadingToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh id and make it current; every earlier id goes stale.
    pub fn reset_initial_page_loading_token(&mut self) -> CycleId {
        self.current += 1;
        CycleId(self.current)
    }

    /// Make every issued id stale without starting a new cycle.
    pub fn cancel(&mut self) {
        self.current += 1;
    }

    pub fn is_valid(&self, id: CycleId) -> bool {
        id.0 == self.current
    }
}
