use std::time::Instant;

use super::{AttributeValue, ObservabilitySink, Span, SpanHandle};

/// Sink that forwards spans to the `tracing` subscriber as log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn start_span(&self, name: &str) -> Span {
        tracing::debug!(span = name, "span started");
        Span::new(Box::new(TracingHandle {
            name: name.to_string(),
            attributes: Vec::new(),
            started: Instant::now(),
        }))
    }
}

struct TracingHandle {
    name: String,
    attributes: Vec<(String, AttributeValue)>,
    started: Instant,
}

impl SpanHandle for TracingHandle {
    fn set_attribute(&mut self, key: &str, value: AttributeValue) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    fn end(self: Box<Self>) {
        let attributes = self
            .attributes
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ");

        tracing::info!(
            span = %self.name,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            attributes = %attributes,
            "span ended"
        );
    }
}
