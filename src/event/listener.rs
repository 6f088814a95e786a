//! Observer registry
//!
//! Listeners are explicit objects registered with the model; there is no
//! global bus. Delivery is synchronous, in registration order.

use super::ModelEvent;

/// Receives model events
pub trait ModelListener: Send {
    fn on_event(&mut self, event: &ModelEvent);
}

impl<F> ModelListener for F
where
    F: FnMut(&ModelEvent) + Send,
{
    fn on_event(&mut self, event: &ModelEvent) {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct Listeners {
    entries: Vec<(ListenerId, Box<dyn ModelListener>)>,
    next_id: u64,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl ModelListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// False if the id was not registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(i, _)| *i != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: &ModelEvent) {
        for (_, listener) in &mut self.entries {
            listener.on_event(event);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}
