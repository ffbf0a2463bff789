use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scalar value attached to a span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Str(s) => write!(f, "{}", s),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// A completed span as seen by a sink that keeps them around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityEvent {
    pub name: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl ObservabilityEvent {
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

/// Sink-specific state of one open span.
pub trait SpanHandle: Send {
    fn set_attribute(&mut self, key: &str, value: AttributeValue);

    /// Close the span. Consumes the handle so it cannot be ended twice.
    fn end(self: Box<Self>);
}

/// Capability the core emits named, timed events to.
pub trait ObservabilitySink: Send + Sync {
    fn start_span(&self, name: &str) -> Span;
}

/// Guard around an open span.
///
/// Ending is tied to ownership: [`Span::end`] consumes the guard and `Drop`
/// ends a span that was never explicitly closed, so every `start_span` is
/// matched by exactly one `SpanHandle::end` whichever way the caller exits.
pub struct Span {
    handle: Option<Box<dyn SpanHandle>>,
}

impl Span {
    pub fn new(handle: Box<dyn SpanHandle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// A span that records nothing.
    pub fn disabled() -> Self {
        Self { handle: None }
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<AttributeValue>) {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_attribute(key, value.into());
        }
    }

    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.end();
        }
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        self.finish();
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("open", &self.handle.is_some())
            .finish()
    }
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ObservabilitySink for NoopSink {
    fn start_span(&self, _name: &str) -> Span {
        Span::disabled()
    }
}
