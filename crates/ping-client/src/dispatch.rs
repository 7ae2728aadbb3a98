//! Inbound event subscriptions.

use std::{collections::HashMap, fmt};

use ping_proto::{EventName, Inbound};

type Handler = Box<dyn FnMut(&Inbound) + Send>;

/// Registry of callbacks keyed by event name.
///
/// Handlers for the same name run in registration order. Handlers are never
/// removed; they live as long as the connection manager.
#[derive(Default)]
pub struct Handlers {
    by_name: HashMap<EventName, Vec<Handler>>,
}

impl Handlers {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events named `name`.
    pub fn on<F>(&mut self, name: EventName, handler: F)
    where
        F: FnMut(&Inbound) + Send + 'static,
    {
        self.by_name.entry(name).or_default().push(Box::new(handler));
    }

    /// Number of handlers registered for `name`.
    pub fn count(&self, name: EventName) -> usize {
        self.by_name.get(&name).map_or(0, Vec::len)
    }

    /// Invoke every handler registered for the event's name.
    pub fn dispatch(&mut self, event: &Inbound) {
        if let Some(handlers) = self.by_name.get_mut(&event.name()) {
            for handler in handlers {
                handler(event);
            }
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self.by_name.iter().map(|(name, h)| (name.as_str(), h.len())).collect();
        f.debug_struct("Handlers").field("registered", &counts).finish()
    }
}
