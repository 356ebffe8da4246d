//! Ticket store: gap-free ticket allocation and per-ticket result slots.
//!
//! Ticket `n` owns the `n`-th slot (1-based), so `len()` is always the
//! highest ticket handed out. A ticket and its slot are created under the
//! same write lock, so no reader can see a ticket without a slot.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

/// Identifier handed back on submission. Starts at 1, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Ticket(u64);

impl Ticket {
    /// Interpret a caller-supplied number; anything below 1 is never a ticket.
    pub fn from_raw(raw: i64) -> Option<Self> {
        u64::try_from(raw).ok().filter(|&n| n >= 1).map(Ticket)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Slot position, or `None` when the ticket cannot address memory here.
    fn index(self) -> Option<usize> {
        usize::try_from(self.0 - 1).ok()
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a reader observes for a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotView {
    NotFound,
    Pending,
    Ready(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Ticket {0} was never allocated")]
    InvalidTicket(u64),
}

#[derive(Debug)]
enum Slot {
    Pending,
    Ready(String),
}

#[derive(Debug, Default)]
pub struct TicketStore {
    slots: RwLock<Vec<Slot>>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pending slot and return its ticket.
    pub fn allocate(&self) -> Ticket {
        let mut slots = self.write();
        slots.push(Slot::Pending);
        Ticket(slots.len() as u64)
    }

    /// Move a slot from `Pending` to `Ready(value)`.
    pub fn publish(&self, ticket: Ticket, value: String) -> Result<(), StoreError> {
        let mut slots = self.write();
        let slot = ticket
            .index()
            .and_then(|index| slots.get_mut(index))
            .ok_or(StoreError::InvalidTicket(ticket.get()))?;
        if let Slot::Ready(_) = slot {
            tracing::warn!(%ticket, "Ticket published twice, keeping first value");
            return Ok(());
        }
        *slot = Slot::Ready(value);
        Ok(())
    }

    pub fn read(&self, ticket: Ticket) -> SlotView {
        let slots = self.read_lock();
        match ticket.index().and_then(|index| slots.get(index)) {
            None => SlotView::NotFound,
            Some(Slot::Pending) => SlotView::Pending,
            Some(Slot::Ready(value)) => SlotView::Ready(value.clone()),
        }
    }

    /// Look up an untrusted ticket number (zero and negatives are `NotFound`).
    pub fn read_raw(&self, raw: i64) -> SlotView {
        match Ticket::from_raw(raw) {
            Some(ticket) => self.read(ticket),
            None => SlotView::NotFound,
        }
    }

    /// Highest ticket allocated so far.
    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, Vec<Slot>> {
        self.slots.read().unwrap_or_else(|poisoned| {
            tracing::error!("Ticket store lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Slot>> {
        self.slots.write().unwrap_or_else(|poisoned| {
            tracing::error!("Ticket store lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn first_ticket_is_one() {
        let store = TicketStore::new();
        assert!(store.is_empty());
        assert_eq!(store.allocate().get(), 1);
        assert_eq!(store.allocate().get(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn fresh_ticket_is_pending() {
        let store = TicketStore::new();
        let ticket = store.allocate();
        assert_eq!(store.read(ticket), SlotView::Pending);
    }

    #[test]
    fn publish_makes_slot_ready_and_stays_ready() {
        let store = TicketStore::new();
        let ticket = store.allocate();
        store.publish(ticket, "digest".to_string()).unwrap();

        for _ in 0..3 {
            assert_eq!(store.read(ticket), SlotView::Ready("digest".to_string()));
        }
    }

    #[test]
    fn publish_unknown_ticket_fails() {
        let store = TicketStore::new();
        store.allocate();
        let beyond = Ticket::from_raw(2).unwrap();
        assert_eq!(
            store.publish(beyond, "x".to_string()),
            Err(StoreError::InvalidTicket(2))
        );
    }

    #[test]
    fn tickets_beyond_32_bits_are_not_found() {
        let store = TicketStore::new();
        let first = store.allocate();
        store.publish(first, "digest".to_string()).unwrap();

        // Would alias slot 0 if the index were truncated to 32 bits.
        assert_eq!(store.read_raw((1 << 32) + 1), SlotView::NotFound);
        assert_eq!(store.read_raw(i64::MAX), SlotView::NotFound);
        let beyond = Ticket::from_raw((1 << 32) + 1).unwrap();
        assert_eq!(
            store.publish(beyond, "x".to_string()),
            Err(StoreError::InvalidTicket((1 << 32) + 1))
        );
    }

    #[test]
    fn second_publish_keeps_first_value() {
        let store = TicketStore::new();
        let ticket = store.allocate();
        store.publish(ticket, "first".to_string()).unwrap();
        store.publish(ticket, "second".to_string()).unwrap();

        assert_eq!(store.read(ticket), SlotView::Ready("first".to_string()));
    }

    #[test]
    fn out_of_range_reads_are_not_found() {
        let store = TicketStore::new();
        store.allocate();

        assert_eq!(store.read_raw(0), SlotView::NotFound);
        assert_eq!(store.read_raw(-1), SlotView::NotFound);
        assert_eq!(store.read_raw(i64::MIN), SlotView::NotFound);
        assert_eq!(store.read_raw(2), SlotView::NotFound);
        assert_eq!(store.read_raw(1), SlotView::Pending);
    }

    #[test]
    fn from_raw_rejects_non_positive() {
        assert!(Ticket::from_raw(0).is_none());
        assert!(Ticket::from_raw(-7).is_none());
        assert_eq!(Ticket::from_raw(7).map(Ticket::get), Some(7));
    }

    #[test]
    fn completion_order_is_independent_of_ticket_order() {
        let store = TicketStore::new();
        let first = store.allocate();
        let second = store.allocate();

        store.publish(second, "two".to_string()).unwrap();
        assert_eq!(store.read(first), SlotView::Pending);
        assert_eq!(store.read(second), SlotView::Ready("two".to_string()));
    }

    #[test]
    fn concurrent_allocation_is_gap_free() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 250;

        let store = Arc::new(TicketStore::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| store.allocate().get())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for ticket in handle.join().unwrap() {
                assert!(seen.insert(ticket), "ticket {ticket} issued twice");
            }
        }

        let expected: HashSet<u64> = (1..=(THREADS * PER_THREAD) as u64).collect();
        assert_eq!(seen, expected);
        assert_eq!(store.len(), THREADS * PER_THREAD);
    }

    #[test]
    fn ticket_serializes_as_bare_integer() {
        let ticket = Ticket::from_raw(42).unwrap();
        insta::assert_json_snapshot!(ticket, @"42");
    }
}
