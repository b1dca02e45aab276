//! Outbound command buffer.
//!
//! Holds commands issued while the socket is not open. Unbounded unless a
//! limit is configured, in which case the oldest command is evicted to make
//! room for the newest.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::mem;

use crate::protocol::PendingCommand;

// ============================================================================
// CommandQueue
// ============================================================================

/// FIFO buffer of commands waiting for an open socket.
#[derive(Debug, Default)]
pub struct CommandQueue {
    items: VecDeque<PendingCommand>,
    limit: Option<usize>,
}

impl CommandQueue {
    /// Creates a queue; `None` means unbounded.
    #[inline]
    #[must_use]
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            items: VecDeque::new(),
            limit,
        }
    }

    /// Appends a command, returning the evicted one if the queue was full.
    pub fn push(&mut self, command: PendingCommand) -> Option<PendingCommand> {
        let evicted = match self.limit {
            Some(limit) if self.items.len() >= limit => self.items.pop_front(),
            _ => None,
        };
        self.items.push_back(command);
        evicted
    }

    /// Takes every queued command, leaving the queue empty.
    ///
    /// Commands pushed after this call land in the now empty queue and are
    /// not part of the returned batch.
    #[inline]
    pub fn take_all(&mut self) -> VecDeque<PendingCommand> {
        mem::take(&mut self.items)
    }

    /// Puts commands back at the front, ahead of anything queued since.
    pub fn restore(&mut self, mut commands: VecDeque<PendingCommand>) {
        commands.append(&mut self.items);
        self.items = commands;
    }

    /// Number of queued commands.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(items: &VecDeque<PendingCommand>) -> Vec<&str> {
        items.iter().map(PendingCommand::kind).collect()
    }

    #[test]
    fn test_take_all_preserves_order_and_empties() {
        let mut queue = CommandQueue::new(None);
        queue.push(PendingCommand::new("a"));
        queue.push(PendingCommand::new("b"));
        queue.push(PendingCommand::new("c"));

        let batch = queue.take_all();
        assert_eq!(kinds(&batch), ["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut queue = CommandQueue::new(Some(2));
        assert!(queue.push(PendingCommand::new("a")).is_none());
        assert!(queue.push(PendingCommand::new("b")).is_none());

        let evicted = queue.push(PendingCommand::new("c")).unwrap();
        assert_eq!(evicted.kind(), "a");
        assert_eq!(kinds(&queue.take_all()), ["b", "c"]);
    }

    #[test]
    fn test_restore_goes_in_front() {
        let mut queue = CommandQueue::new(None);
        queue.push(PendingCommand::new("a"));
        queue.push(PendingCommand::new("b"));
        let mut batch = queue.take_all();
        batch.pop_front();

        queue.push(PendingCommand::new("late"));
        queue.restore(batch);

        assert_eq!(kinds(&queue.take_all()), ["b", "late"]);
    }
}
