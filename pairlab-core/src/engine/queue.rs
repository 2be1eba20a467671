//! FIFO event queue shared by every component of the loop.

use crate::domain::Event;
use std::collections::{HashSet, VecDeque};
use tracing::warn;

/// Ordered, single-consumer event queue.
///
/// The queue only admits events whose symbol belongs to the configured
/// universe. Market events carry no symbol and are always admitted.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
    universe: HashSet<String>,
    dropped: usize,
}

impl EventQueue {
    pub fn new<I, S>(universe: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: VecDeque::new(),
            universe: universe.into_iter().map(Into::into).collect(),
            dropped: 0,
        }
    }

    /// Enqueue at the back. Returns `false` if the event was dropped.
    pub fn push(&mut self, event: Event) -> bool {
        if let Some(symbol) = event.symbol() {
            if !self.universe.contains(symbol) {
                warn!(kind = event.kind(), %symbol, "dropping event outside universe");
                self.dropped += 1;
                return false;
            }
        }
        self.events.push_back(event);
        true
    }

    pub fn extend<I: IntoIterator<Item = Event>>(&mut self, events: I) {
        for event in events {
            self.push(event);
        }
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events rejected because their symbol was outside the universe.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn in_universe(&self, symbol: &str) -> bool {
        self.universe.contains(symbol)
    }
}
