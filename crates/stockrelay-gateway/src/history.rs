use std::collections::VecDeque;

use stockrelay_core::Envelope;

/// Fixed-capacity, insertion-ordered buffer of recent envelopes.
///
/// Appending to a full buffer evicts the oldest entry. Nothing survives a
/// restart.
#[derive(Debug)]
pub struct HistoryBuffer {
    capacity: usize,
    entries: VecDeque<Envelope>,
}

impl HistoryBuffer {
    /// Creates an empty buffer holding at most `capacity` envelopes.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Adds `envelope` at the tail, evicting from the head when full.
    pub fn append(&mut self, envelope: Envelope) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(envelope);
    }

    /// Copy of the buffer, oldest first.
    pub fn snapshot(&self) -> Vec<Envelope> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
