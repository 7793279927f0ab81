//! Run lifecycle events and sinks.
//!
//! The orchestrator reports its start/failure/stop markers through an
//! injected [`EventSink`] instead of a process-global logging call, so
//! tests can capture the sequence without touching global state. The
//! default sink forwards to `tracing`.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::types::LogMessage;

/// Lifecycle marker emitted by a task or job run.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    /// Run began; emitted before `setup`, unconditionally.
    Started {
        /// When the run began.
        at: DateTime<Utc>,
    },
    /// Run failed; carries the rendered error detail.
    Failed {
        /// Rendered error detail.
        message: LogMessage,
        /// When the failure was observed.
        at: DateTime<Utc>,
    },
    /// Run ended; emitted after `teardown` on every exit path.
    Stopped {
        /// When the run ended.
        at: DateTime<Utc>,
    },
}

impl RunEvent {
    pub(crate) fn started() -> Self {
        RunEvent::Started { at: Utc::now() }
    }

    pub(crate) fn failed(message: impl Into<LogMessage>) -> Self {
        RunEvent::Failed {
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub(crate) fn stopped() -> Self {
        RunEvent::Stopped { at: Utc::now() }
    }

    /// Returns `true` for `Failed` events.
    pub fn is_failure(&self) -> bool {
        matches!(self, RunEvent::Failed { .. })
    }
}

/// Sink for run lifecycle events.
pub trait EventSink {
    /// Record one event.
    fn record(&self, event: &RunEvent);
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn record(&self, event: &RunEvent) {
        (**self).record(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn record(&self, event: &RunEvent) {
        (**self).record(event);
    }
}

/// Default sink: `INFO` start/stop markers, `WARNING` plus error detail on
/// failure, via `tracing`.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &RunEvent) {
        match event {
            RunEvent::Started { .. } => tracing::info!("start"),
            RunEvent::Failed { message, .. } => {
                tracing::warn!(detail = message.as_str(), "failed");
            }
            RunEvent::Stopped { .. } => tracing::info!("stop"),
        }
    }
}

/// Sink that captures events in memory for inspection.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<RunEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloned snapshot of the events recorded so far, in order.
    pub fn snapshot(&self) -> Vec<RunEvent> {
        self.events.lock().expect("event sink poisoned").clone()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &RunEvent) {
        self.events
            .lock()
            .expect("event sink poisoned")
            .push(event.clone());
    }
}
