//! Connection ids and the free-list that hands them out.

use std::collections::BTreeSet;
use std::fmt;

/// A small, stable id for a server-side connection.
///
/// Ids are reused: once a connection is gone its id goes back to the
/// [`SlotAllocator`] and the next accepted connection may receive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Hands out the lowest free non-negative id.
///
/// Every id below `next` is either in use or sitting in `free`.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    free: BTreeSet<u32>,
    next: u32,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lowest free id.
    pub fn acquire(&mut self) -> ConnectionId {
        if let Some(id) = self.free.pop_first() {
            return ConnectionId(id);
        }
        let id = self.next;
        self.next += 1;
        ConnectionId(id)
    }

    /// Returns `id` to the free-list.
    ///
    /// Returns `false` if the id was never handed out or is already free.
    pub fn release(&mut self, id: ConnectionId) -> bool {
        if id.0 >= self.next {
            return false;
        }
        self.free.insert(id.0)
    }

    /// Number of ids currently handed out.
    pub fn in_use(&self) -> usize {
        self.next as usize - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_zero_and_grow() {
        let mut slots = SlotAllocator::new();
        assert_eq!(slots.acquire(), ConnectionId(0));
        assert_eq!(slots.acquire(), ConnectionId(1));
        assert_eq!(slots.acquire(), ConnectionId(2));
        assert_eq!(slots.in_use(), 3);
    }

    #[test]
    fn test_lowest_free_id_is_reused_first() {
        let mut slots = SlotAllocator::new();
        for _ in 0..4 {
            slots.acquire();
        }
        assert!(slots.release(ConnectionId(2)));
        assert!(slots.release(ConnectionId(0)));

        assert_eq!(slots.acquire(), ConnectionId(0));
        assert_eq!(slots.acquire(), ConnectionId(2));
        assert_eq!(slots.acquire(), ConnectionId(4));
    }

    #[test]
    fn test_release_rejects_unknown_and_double_free() {
        let mut slots = SlotAllocator::new();
        let id = slots.acquire();
        assert!(!slots.release(ConnectionId(7)));
        assert!(slots.release(id));
        assert!(!slots.release(id));
        assert_eq!(slots.in_use(), 0);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId(7).to_string(), "conn-7");
    }
}
