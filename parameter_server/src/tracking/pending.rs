use std::collections::HashMap;

use comms::{Clock, Message};

/// Holds deferred operations indexed by the clock at which they become eligible.
///
/// Items pushed under the same key are released in insertion order.
#[derive(Debug)]
pub struct PendingBuffer<T = Message> {
    buffer: HashMap<Clock, Vec<T>>,
}

impl<T> Default for PendingBuffer<T> {
    fn default() -> Self {
        Self {
            buffer: HashMap::new(),
        }
    }
}

impl<T> PendingBuffer<T> {
    /// Creates a new empty `PendingBuffer`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defers `item` until `clock` is released.
    ///
    /// # Arguments
    /// * `clock` - The deferral key.
    /// * `item` - The deferred operation.
    pub fn push(&mut self, clock: Clock, item: T) {
        self.buffer.entry(clock).or_default().push(item);
    }

    /// Removes and returns everything deferred under `clock`.
    ///
    /// # Arguments
    /// * `clock` - The deferral key.
    ///
    /// # Returns
    /// The deferred items in insertion order, empty if there were none.
    pub fn pop_all(&mut self, clock: Clock) -> Vec<T> {
        self.buffer.remove(&clock).unwrap_or_default()
    }

    /// The amount of items deferred under `clock`.
    pub fn size(&self, clock: Clock) -> usize {
        self.buffer.get(&clock).map_or(0, Vec::len)
    }

    /// The amount of items deferred under every key.
    pub fn len(&self) -> usize {
        self.buffer.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_all_is_fifo_and_clears_the_key() {
        let mut buffer = PendingBuffer::new();
        buffer.push(3, "a");
        buffer.push(4, "x");
        buffer.push(3, "b");
        buffer.push(3, "c");

        assert_eq!(buffer.size(3), 3);
        assert_eq!(buffer.size(4), 1);
        assert_eq!(buffer.len(), 4);

        assert_eq!(buffer.pop_all(3), ["a", "b", "c"]);
        assert_eq!(buffer.size(3), 0);
        assert!(buffer.pop_all(3).is_empty());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn missing_keys_are_empty() {
        let mut buffer: PendingBuffer<u8> = PendingBuffer::new();
        assert_eq!(buffer.size(0), 0);
        assert!(buffer.pop_all(0).is_empty());
        assert!(buffer.is_empty());
    }
}
