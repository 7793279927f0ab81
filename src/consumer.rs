//! Terminal sink contracts and built-in consumers.
//!
//! A consumer terminates a bracketed stream: `Start` drives `setup`,
//! `Stop` drives `teardown`, data records drive `process` after
//! required-column validation, and `Error` elements reach the `on_error`
//! hook. `accept` owns the per-element dispatch so fan-out and routing
//! consumers can deliver elements one at a time with intact lifecycles.

use std::sync::{Arc, Mutex};

use crate::data::{Element, ElementStream, Metadata, Record};
use crate::errors::PipelineError;
use crate::types::{ColumnName, ConsumerName};

/// Terminal sink contract.
pub trait Consumer {
    /// Stable consumer identifier used in validation errors and traces.
    fn name(&self) -> &str;

    /// Columns every record must carry; empty means no validation.
    fn required_columns(&self) -> &[ColumnName] {
        &[]
    }

    /// Handle the head-of-stream signal.
    fn setup(&mut self, _meta: &Metadata) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Consume one record. Terminal: side effects only, nothing returns to
    /// the stream.
    fn process(&mut self, record: Record) -> Result<(), PipelineError>;

    /// Handle the tail-of-stream signal.
    fn teardown(&mut self, _meta: &Metadata) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Handle a reserved in-stream `Error` element.
    ///
    /// Default logs a warning and continues the stream.
    fn on_error(&mut self, message: &str, _meta: &Metadata) -> Result<(), PipelineError> {
        tracing::warn!(
            consumer = self.name(),
            detail = message,
            "error element reached consumer"
        );
        Ok(())
    }

    /// Dispatch one element to the matching lifecycle handler.
    ///
    /// Data records are validated against `required_columns` first; a
    /// record missing any of them fails with `MissingRequiredColumns`
    /// naming every absent column.
    fn accept(&mut self, element: Element) -> Result<(), PipelineError> {
        match element {
            Element::Start(meta) => self.setup(&meta),
            Element::Stop(meta) => self.teardown(&meta),
            Element::Error { message, meta } => self.on_error(&message, &meta),
            Element::Data(record) => {
                let missing: Vec<ColumnName> = self
                    .required_columns()
                    .iter()
                    .filter(|column| !record.contains_column(column))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    return Err(PipelineError::MissingRequiredColumns {
                        consumer: self.name().to_string(),
                        missing,
                        record,
                    });
                }
                self.process(record)
            }
        }
    }

    /// Drain a whole stream through `accept`, propagating the first
    /// failure (stream errors included) unmodified.
    fn consume(&mut self, source: ElementStream<'_>) -> Result<(), PipelineError> {
        for element in source {
            self.accept(element?)?;
        }
        Ok(())
    }
}

/// Consumer that logs every record at `INFO`.
pub struct LogConsumer {
    name: ConsumerName,
}

impl LogConsumer {
    /// Create a logging consumer named `log`.
    pub fn new() -> Self {
        Self {
            name: "log".to_string(),
        }
    }

    /// Override the consumer name used in the emitted events.
    pub fn with_name(mut self, name: impl Into<ConsumerName>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for LogConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl Consumer for LogConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, record: Record) -> Result<(), PipelineError> {
        tracing::info!(consumer = self.name.as_str(), record = %record, "record");
        Ok(())
    }
}

/// Consumer that accumulates records behind a shared handle.
///
/// The handle stays valid after the consumer moves into a workflow, so
/// callers can inspect what was consumed once the run finishes.
pub struct CollectingConsumer {
    name: ConsumerName,
    required_columns: Vec<ColumnName>,
    records: Arc<Mutex<Vec<Record>>>,
}

impl CollectingConsumer {
    /// Create a collector named `collector` with no required columns.
    pub fn new() -> Self {
        Self {
            name: "collector".to_string(),
            required_columns: Vec::new(),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Override the consumer name.
    pub fn with_name(mut self, name: impl Into<ConsumerName>) -> Self {
        self.name = name.into();
        self
    }

    /// Require the given columns on every record.
    pub fn with_required_columns(mut self, columns: &[&str]) -> Self {
        self.required_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Shared handle onto the accumulated records.
    pub fn handle(&self) -> Arc<Mutex<Vec<Record>>> {
        Arc::clone(&self.records)
    }

    /// Cloned snapshot of the records consumed so far.
    pub fn snapshot(&self) -> Vec<Record> {
        self.records.lock().expect("collector poisoned").clone()
    }
}

impl Default for CollectingConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl Consumer for CollectingConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_columns(&self) -> &[ColumnName] {
        &self.required_columns
    }

    fn process(&mut self, record: Record) -> Result<(), PipelineError> {
        self.records.lock().expect("collector poisoned").push(record);
        Ok(())
    }
}
