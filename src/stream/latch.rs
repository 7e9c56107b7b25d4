//! Completion latch over a dynamically discovered set of work units.
//!
//! The number of units is not known up front: the primary fetch registers
//! itself, and only once it returns do we know how many enrichment fetches
//! join it.  Registration and closing are therefore separate from
//! signalling, and the latch finalizes exactly once, on whichever call first
//! sees `closed && completed == registered`.
//!
//! Finalization is reported as [`Progress::Finalized`] from the call that
//! caused it rather than through a stored callback, so the owner can act on
//! it with full `&mut` access to its own state.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

static NEXT_LATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Misuse of a [`Latch`].  Always a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LatchError {
    #[error("register after close")]
    RegisterAfterClose,
    #[error("latch closed twice")]
    AlreadyClosed,
    #[error("unit does not belong to this latch")]
    ForeignUnit,
}

/// What a `close` or `signal` call did to the latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending,
    /// This call fired the finalize.  Returned at most once per latch.
    Finalized,
}

/// Proof of one registration.  Consumed by [`Latch::signal`] and not
/// `Clone`, so a unit cannot be signalled twice and a latch can never see
/// more signals than registrations.
#[derive(Debug)]
#[must_use = "an unsignalled unit keeps the latch from finalizing"]
pub struct Unit {
    latch: u64,
    index: usize,
}

#[derive(Debug)]
pub struct Latch {
    id: u64,
    registered: usize,
    completed: usize,
    closed: bool,
    finalized: bool,
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

impl Latch {
    pub fn new() -> Self {
        Self {
            id: NEXT_LATCH_ID.fetch_add(1, Ordering::Relaxed),
            registered: 0,
            completed: 0,
            closed: false,
            finalized: false,
        }
    }

    pub fn register(&mut self) -> Result<Unit, LatchError> {
        if self.closed {
            return Err(LatchError::RegisterAfterClose);
        }
        let unit = Unit {
            latch: self.id,
            index: self.registered,
        };
        self.registered += 1;
        Ok(unit)
    }

    /// Forbid further registrations.  Finalizes immediately if every
    /// registered unit (possibly none) has already signalled.
    pub fn close(&mut self) -> Result<Progress, LatchError> {
        if self.closed {
            return Err(LatchError::AlreadyClosed);
        }
        self.closed = true;
        Ok(self.try_finalize())
    }

    pub fn signal(&mut self, unit: Unit) -> Result<Progress, LatchError> {
        if unit.latch != self.id || unit.index >= self.registered {
            return Err(LatchError::ForeignUnit);
        }
        // Each unit is moved in exactly once.
        debug_assert!(self.completed < self.registered);
        self.completed += 1;
        Ok(self.try_finalize())
    }

    pub fn registered(&self) -> usize {
        self.registered
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn try_finalize(&mut self) -> Progress {
        if self.closed && !self.finalized && self.completed == self.registered {
            self.finalized = true;
            Progress::Finalized
        } else {
            Progress::Pending
        }
    }
}
