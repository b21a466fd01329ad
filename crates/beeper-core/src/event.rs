//! Events delivered to the beep service and the queue that serializes them.

use heapless::Deque;
use thiserror::Error;

use crate::consts::EVENT_QUEUE_CAPACITY;

/// Where a stop request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSource {
    /// Explicit stop from the presentation layer.
    User,
    /// The stop action embedded in the presence indicator.
    Indicator,
    /// Host-initiated teardown.
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The alarm registered with this generation went off.
    TriggerFired(u64),
    Stop(StopSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event queue full, dropped {0:?}")]
pub struct QueueFull(pub Event);

/// Bounded FIFO of pending events. Stop requests jump the line so they take
/// effect at the next dispatch boundary, and are never refused: on a full
/// queue the newest trigger fire is dropped to make room.
pub struct EventQueue {
    events: Deque<Event, EVENT_QUEUE_CAPACITY>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            events: Deque::new(),
        }
    }

    pub fn push(&mut self, event: Event) -> Result<(), QueueFull> {
        match event {
            Event::Stop(_) => {
                if matches!(self.events.front(), Some(Event::Stop(_))) {
                    // One pending stop is enough.
                    return Ok(());
                }
                if self.events.is_full() {
                    let dropped = self.events.pop_back();
                    log::debug!("event queue full, {:?} dropped for stop", dropped);
                }
                self.events.push_front(event).map_err(QueueFull)
            }
            Event::TriggerFired(_) => self.events.push_back(event).map_err(QueueFull),
        }
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
