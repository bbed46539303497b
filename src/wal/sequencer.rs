//! LSN Sequencer
//!
//! Issues Log Sequence Numbers in write order. One sequencer belongs to one
//! log handle; nothing is shared between instances.

use super::Lsn;

/// Monotonic LSN generator
///
/// Wraps at 2^32.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    next: Lsn,
}

impl Sequencer {
    /// Start handing out LSNs at `start`
    pub fn new(start: Lsn) -> Self {
        Self { next: start }
    }

    /// Continue after `last`, the highest LSN already persisted
    pub fn resume_after(last: Lsn) -> Self {
        Self::new(last.wrapping_add(1))
    }

    /// Return the current LSN and advance by one
    pub fn next(&mut self) -> Lsn {
        let lsn = self.next;
        self.next = self.next.wrapping_add(1);
        lsn
    }

    /// The LSN the next call to `next` will return
    pub fn peek(&self) -> Lsn {
        self.next
    }
}
