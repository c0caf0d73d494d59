//! Captured call data: the raw invocation packet and the finished audit record.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::policy::CallSite;

/// A value whose serialization is deferred to a worker.
///
/// Implemented for every `Serialize + Send + 'static` type, so the
/// interceptor only moves values on the calling thread.
pub trait Capture: Send + 'static {
    fn capture(&self) -> Result<Value, serde_json::Error>;
}

impl<T> Capture for T
where
    T: Serialize + Send + 'static,
{
    fn capture(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Render a captured value as text. `null` renders as an empty string.
pub fn render_capture(value: &dyn Capture) -> Result<String, serde_json::Error> {
    Ok(match value.capture()? {
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Named arguments of an instrumented call.
#[derive(Default)]
pub struct Args {
    entries: Vec<(String, Box<dyn Capture>)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, builder style.
    pub fn with<V: Capture>(mut self, name: impl Into<String>, value: V) -> Self {
        self.push(name, value);
        self
    }

    pub fn push<V: Capture>(&mut self, name: impl Into<String>, value: V) {
        self.entries.push((name.into(), Box::new(value)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Render as a JSON object of name → value. No arguments render as "".
    pub fn render(&self) -> Result<String, serde_json::Error> {
        if self.entries.is_empty() {
            return Ok(String::new());
        }
        let mut map = Map::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            map.insert(name.clone(), value.capture()?);
        }
        Ok(Value::Object(map).to_string())
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// How an instrumented call completed.
pub enum Outcome {
    /// The call returned normally.
    Returned(Box<dyn Capture>),
    /// The call returned an error or panicked.
    Failed { message: String, location: String },
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Returned(_) => f.write_str("Returned(..)"),
            Outcome::Failed { message, location } => f
                .debug_struct("Failed")
                .field("message", message)
                .field("location", location)
                .finish(),
        }
    }
}

/// Everything the interceptor observed about one call, not yet serialized.
#[derive(Debug)]
pub struct Invocation {
    pub id: Uuid,
    pub site: CallSite,
    pub args: Args,
    pub outcome: Outcome,
    /// Epoch milliseconds.
    pub start_time: i64,
    /// Epoch milliseconds, never before `start_time`.
    pub end_time: i64,
}

impl Invocation {
    pub fn elapsed_ms(&self) -> i64 {
        self.end_time - self.start_time
    }

    pub fn failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

/// Finished metadata for one completed call, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub id: Uuid,
    pub target_address: String,
    pub args_text: String,
    pub result_text: String,
    pub error_message: String,
    pub error_location: String,
    pub start_time: i64,
    pub end_time: i64,
    /// Overrides the configured default directory when non-blank.
    pub persistence_path: Option<String>,
}

impl AuditRecord {
    pub fn elapsed_ms(&self) -> i64 {
        self.end_time - self.start_time
    }
}
