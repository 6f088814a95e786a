//! Event recorder
//!
//! Thread-safe, append-only log of model events with monotonic ids and
//! timestamps relative to the log's creation. Clones share the same log, so
//! one clone can be subscribed to a model while another is inspected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ModelEvent, ModelListener};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Monotonic sequence id
    pub id: u64,
    /// Time since the log was created (ms)
    pub timestamp_ms: u64,
    pub event: ModelEvent,
}

#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<RecordedEvent>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record an event, returns its id
    pub fn record(&self, event: ModelEvent) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let recorded = RecordedEvent {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            event,
        };
        self.events.write().push(recorded);
        id
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().clone()
    }

    /// Texts of every `change` event, oldest first
    pub fn change_texts(&self) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter_map(|e| match &e.event {
                ModelEvent::Change { text, .. } => Some(text.clone()),
                ModelEvent::YamlError { .. } => None,
            })
            .collect()
    }

    /// Count of events with the given name (`change` / `yaml-error`)
    pub fn count(&self, name: &str) -> usize {
        self.events
            .read()
            .iter()
            .filter(|e| e.event.name() == name)
            .count()
    }

    pub fn last(&self) -> Option<RecordedEvent> {
        self.events.read().last().cloned()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModelListener for EventLog {
    fn on_event(&mut self, event: &ModelEvent) {
        self.record(event.clone());
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeOrigin;

    fn change(generation: u64, text: &str) -> ModelEvent {
        ModelEvent::Change {
            generation,
            deltas: Vec::new(),
            text: text.to_string(),
            origin: ChangeOrigin::Text,
        }
    }

    #[test]
    fn record_returns_monotonic_ids() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.record(change(1, "a")), 0);
        assert_eq!(log.record(change(2, "b")), 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.change_texts(), vec!["a", "b"]);
    }

    #[test]
    fn clones_share_the_log() {
        let log = EventLog::new();
        let mut listener = log.clone();
        listener.on_event(&change(1, "x"));
        listener.on_event(&ModelEvent::YamlError {
            generation: 2,
            errors: Vec::new(),
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.count("change"), 1);
        assert_eq!(log.count("yaml-error"), 1);
        assert_eq!(log.last().unwrap().event.generation(), 2);
    }

    #[test]
    fn to_json_keeps_event_tag() {
        let log = EventLog::new();
        log.record(change(5, "t"));
        let json = log.to_json();
        assert_eq!(json[0]["event"]["type"], "change");
        assert_eq!(json[0]["event"]["generation"], 5);
    }

    #[test]
    fn concurrent_records_get_unique_ids() {
        let log = EventLog::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                std::thread::spawn(move || log.record(change(i, "t")))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let mut ids: Vec<u64> = log.events().iter().map(|e| e.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }
}
