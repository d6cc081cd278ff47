//! Operations waiting for an open connection.

use std::collections::VecDeque;

use tracing::warn;
use weft_editor_core::Operation;

/// Bounded FIFO of unsent operations.
///
/// When full, new operations are rejected and the queued prefix is kept
/// intact, so whatever is eventually delivered is a consistent prefix of
/// what the replica produced.
#[derive(Debug)]
pub struct Outbox {
    queue: VecDeque<Operation>,
    capacity: usize,
    dropped: u64,
}

impl Outbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity,
            dropped: 0,
        }
    }

    /// Queue an operation. Returns `false` if it was dropped.
    pub fn push(&mut self, op: Operation) -> bool {
        if self.queue.len() >= self.capacity {
            self.dropped += 1;
            warn!(
                capacity = self.capacity,
                dropped = self.dropped,
                ?op,
                "outbox full, dropping operation"
            );
            return false;
        }
        self.queue.push_back(op);
        true
    }

    /// Put an operation whose send failed back at the head of the queue.
    ///
    /// Ignores the capacity: the operation was already accepted once.
    pub fn requeue(&mut self, op: Operation) {
        self.queue.push_front(op);
    }

    pub fn pop(&mut self) -> Option<Operation> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Operations rejected because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo() {
        let mut outbox = Outbox::new(4);
        outbox.push(Operation::delete(1));
        outbox.push(Operation::delete(2));
        assert_eq!(outbox.pop(), Some(Operation::delete(1)));
        assert_eq!(outbox.pop(), Some(Operation::delete(2)));
        assert!(outbox.pop().is_none());
    }

    #[test]
    fn test_full_rejects_newest() {
        let mut outbox = Outbox::new(2);
        assert!(outbox.push(Operation::delete(1)));
        assert!(outbox.push(Operation::delete(2)));
        assert!(!outbox.push(Operation::delete(3)));
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox.dropped(), 1);
        assert_eq!(outbox.pop(), Some(Operation::delete(1)));
    }

    #[test]
    fn test_requeue_goes_first() {
        let mut outbox = Outbox::new(2);
        outbox.push(Operation::delete(2));
        outbox.push(Operation::delete(3));
        outbox.requeue(Operation::delete(1));
        assert_eq!(outbox.len(), 3);
        assert_eq!(outbox.pop(), Some(Operation::delete(1)));
    }
}
