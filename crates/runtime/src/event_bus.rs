use std::fmt;

use serde::Serialize;

/// An outbound event stamped with its emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<E> {
    pub sequence: u64,
    #[serde(flatten)]
    pub event: E,
}

type Listener<E> = Box<dyn FnMut(&Envelope<E>)>;

/// Ordered outbound event log.
///
/// Listeners are invoked synchronously on emit, in registration order. Events
/// are also retained until drained so hosts that poll see the same stream.
pub struct EventBus<E> {
    next_sequence: u64,
    events: Vec<Envelope<E>>,
    listeners: Vec<Listener<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_sequence: 0,
            events: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("next_sequence", &self.next_sequence)
            .field("events", &self.events)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Envelope<E>) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, event: E) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let envelope = Envelope { sequence, event };
        for listener in &mut self.listeners {
            listener(&envelope);
        }
        self.events.push(envelope);
        sequence
    }

    pub fn events(&self) -> &[Envelope<E>] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Envelope<E>> {
        std::mem::take(&mut self.events)
    }

    /// Drops retained events and listeners. Sequence numbers keep counting.
    pub fn clear(&mut self) {
        self.events.clear();
        self.listeners.clear();
    }
}
