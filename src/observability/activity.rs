//! Activity log sink.
//!
//! Pipeline outcomes are reported here fire-and-forget. A sink that fails
//! never fails the request being described: [`record_activity`] swallows the
//! error after a debug trace.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("activity sink unavailable: {0}")]
    Unavailable(String),
}

pub trait ActivitySink: Send + Sync {
    fn record(&self, level: ActivityLevel, message: &str, metadata: &Value) -> Result<(), ActivityError>;
}

/// Report to `sink`, ignoring failures.
pub fn record_activity(sink: &dyn ActivitySink, level: ActivityLevel, message: &str, metadata: Value) {
    if let Err(e) = sink.record(level, message, &metadata) {
        tracing::debug!(error = %e, activity = message, "Activity record dropped");
    }
}

/// Emits activity as `tracing` events under the `activity` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivitySink;

impl ActivitySink for TracingActivitySink {
    fn record(&self, level: ActivityLevel, message: &str, metadata: &Value) -> Result<(), ActivityError> {
        match level {
            ActivityLevel::Debug => tracing::debug!(target: "activity", %metadata, "{}", message),
            ActivityLevel::Info => tracing::info!(target: "activity", %metadata, "{}", message),
            ActivityLevel::Warn => tracing::warn!(target: "activity", %metadata, "{}", message),
            ActivityLevel::Error => tracing::error!(target: "activity", %metadata, "{}", message),
        }
        Ok(())
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    pub level: ActivityLevel,
    pub message: String,
    pub metadata: Value,
}

/// Keeps events in memory. Handy for inspection in tests.
#[derive(Debug, Default)]
pub struct MemoryActivitySink {
    events: Mutex<Vec<ActivityEvent>>,
}

impl MemoryActivitySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ActivitySink for MemoryActivitySink {
    fn record(&self, level: ActivityLevel, message: &str, metadata: &Value) -> Result<(), ActivityError> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| ActivityError::Unavailable("event buffer poisoned".into()))?;
        events.push(ActivityEvent {
            level,
            message: message.to_string(),
            metadata: metadata.clone(),
        });
        Ok(())
    }
}
