use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::{AttributeValue, ObservabilityEvent, ObservabilitySink, Span, SpanHandle};

/// Sink that keeps every completed span in memory.
///
/// Clones share the same buffer, so a test can hand one clone to the ledger
/// and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ObservabilityEvent>>>,
    started: Arc<AtomicUsize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed spans, in the order they ended.
    pub fn events(&self) -> Vec<ObservabilityEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Completed spans with the given name.
    pub fn events_named(&self, name: &str) -> Vec<ObservabilityEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.name == name)
            .collect()
    }

    /// Number of spans started so far.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Spans started but not yet ended.
    pub fn open_spans(&self) -> usize {
        let ended = self.events.lock().unwrap_or_else(PoisonError::into_inner).len();
        self.started().saturating_sub(ended)
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.started.store(0, Ordering::SeqCst);
    }
}

impl ObservabilitySink for RecordingSink {
    fn start_span(&self, name: &str) -> Span {
        self.started.fetch_add(1, Ordering::SeqCst);
        Span::new(Box::new(RecordingHandle {
            name: name.to_string(),
            attributes: BTreeMap::new(),
            started_at: Utc::now(),
            events: Arc::clone(&self.events),
        }))
    }
}

struct RecordingHandle {
    name: String,
    attributes: BTreeMap<String, AttributeValue>,
    started_at: DateTime<Utc>,
    events: Arc<Mutex<Vec<ObservabilityEvent>>>,
}

impl SpanHandle for RecordingHandle {
    fn set_attribute(&mut self, key: &str, value: AttributeValue) {
        self.attributes.insert(key.to_string(), value);
    }

    fn end(self: Box<Self>) {
        let RecordingHandle {
            name,
            attributes,
            started_at,
            events,
        } = *self;

        events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ObservabilityEvent {
                name,
                attributes,
                started_at,
                ended_at: Utc::now(),
            });
    }
}
