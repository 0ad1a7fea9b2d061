//! Per-worker batch accumulation.

use std::fmt;

use crate::domain::models::Identifier;

/// Why a batch was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// The batch reached its capacity
    Capacity,
    /// No identifier arrived within the idle window
    IdleTimeout,
    /// The input queue was closed by every producer
    InputClosed,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Capacity => "capacity",
            Self::IdleTimeout => "idle-timeout",
            Self::InputClosed => "input-closed",
        };
        f.write_str(s)
    }
}

/// Bounded buffer of identifiers owned by a single worker.
///
/// The buffer is allocated once and cleared in place after every flush.
#[derive(Debug)]
pub struct BatchAssembler {
    batch: Vec<Identifier>,
    capacity: usize,
}

impl BatchAssembler {
    /// Create an assembler holding at most `capacity` identifiers.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "batch capacity must be greater than 0");
        Self {
            batch: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an identifier.
    ///
    /// Returns `true` when the batch has just reached capacity and must be
    /// flushed before the next append.
    pub fn push(&mut self, id: Identifier) -> bool {
        debug_assert!(self.batch.len() < self.capacity, "flush was skipped");
        self.batch.push(id);
        self.is_full()
    }

    /// The identifiers waiting to be flushed, in arrival order.
    pub fn pending(&self) -> &[Identifier] {
        &self.batch
    }

    /// Drop the pending identifiers, keeping the allocation.
    pub fn clear(&mut self) {
        self.batch.clear();
    }

    /// Number of pending identifiers.
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// True when the batch holds `capacity` identifiers.
    pub fn is_full(&self) -> bool {
        self.batch.len() >= self.capacity
    }

    /// Maximum batch size.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
