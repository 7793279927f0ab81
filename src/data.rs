//! Core record, signal, and stream types.
//!
//! Ownership model:
//! - `Record` is the unit of data flowing through a stream: an ordered,
//!   schema-less mapping from column name to dynamically typed value.
//! - `Element` is what actually travels on a stream: a data record or one
//!   of the lifecycle signals (`Start`, `Stop`, `Error`).
//! - Streams are lazy, single-use, forward-only iterators of
//!   `Result<Element, PipelineError>`; an `Err` item terminates the stream.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::types::{ColumnName, LogMessage};

/// Dynamically typed column value.
pub use serde_json::Value;

/// Metadata mapping carried by lifecycle signals.
///
/// Same shape as a record's columns, but never column-projected.
pub type Metadata = IndexMap<ColumnName, Value>;

/// Lazy stream of elements. Single-use and forward-only; the first `Err`
/// item ends the stream.
pub type ElementStream<'a> = Box<dyn Iterator<Item = Result<Element, PipelineError>> + 'a>;

/// Lazy stream of bare records, as emitted by a producer's `to_stream`.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<Record, PipelineError>> + 'a>;

/// Ordered mapping from column name to value; the unit of data flowing
/// through the system.
///
/// There is no fixed schema: any stage may add, remove, or rename columns
/// via projection. Insertion order is preserved, and replacing an existing
/// column keeps its position, which is what makes logged-column merging
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    columns: IndexMap<ColumnName, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(column, value)` pairs, preserving order.
    pub fn from_pairs<C, V>(pairs: impl IntoIterator<Item = (C, V)>) -> Self
    where
        C: Into<ColumnName>,
        V: Into<Value>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(column, value)| (column.into(), value.into()))
                .collect(),
        }
    }

    /// Insert a column value, returning the previous value if present.
    ///
    /// An existing column keeps its position; a new column appends.
    pub fn insert(&mut self, column: impl Into<ColumnName>, value: impl Into<Value>) -> Option<Value> {
        self.columns.insert(column.into(), value.into())
    }

    /// Look up a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Returns `true` when the record has a value for `column`.
    pub fn contains_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Iterate column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnName> {
        self.columns.keys()
    }

    /// Iterate `(column, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ColumnName, &Value)> {
        self.columns.iter()
    }

    /// Number of columns in the record.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` when the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.columns) {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => write!(f, "{:?}", self.columns),
        }
    }
}

impl From<Record> for Element {
    fn from(record: Record) -> Self {
        Element::Data(record)
    }
}

/// One element of a stream: a data record or a lifecycle signal.
///
/// A well-formed stream is exactly one `Start`, zero or more `Data` (and,
/// reserved, `Error`) elements, then exactly one `Stop`. Every component
/// that transforms a stream preserves this bracketing.
///
/// `Error` is a reserved carrier for in-stream error propagation. No
/// built-in component emits it; stages forward it without projection and
/// consumers hand it to their `on_error` hook.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    /// Head-of-stream signal; triggers `setup`.
    Start(Metadata),
    /// Tail-of-stream signal; triggers `teardown`.
    Stop(Metadata),
    /// Reserved in-stream error carrier.
    Error {
        /// Human-readable description of the error condition.
        message: LogMessage,
        /// Additional metadata about the error condition.
        meta: Metadata,
    },
    /// A data record.
    Data(Record),
}

impl Element {
    /// `Start` signal with empty metadata.
    pub fn start() -> Self {
        Element::Start(Metadata::new())
    }

    /// `Stop` signal with empty metadata.
    pub fn stop() -> Self {
        Element::Stop(Metadata::new())
    }

    /// Returns `true` for `Start`, `Stop`, and `Error` elements.
    pub fn is_signal(&self) -> bool {
        !matches!(self, Element::Data(_))
    }

    /// Returns `true` for data records.
    pub fn is_data(&self) -> bool {
        matches!(self, Element::Data(_))
    }

    /// Borrow the record of a `Data` element.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Element::Data(record) => Some(record),
            _ => None,
        }
    }

    /// Take the record out of a `Data` element.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Element::Data(record) => Some(record),
            _ => None,
        }
    }

    /// Look up `column` in a data record, or the same key in a signal's
    /// metadata. Used by logged-column capture.
    pub fn column(&self, column: &str) -> Option<&Value> {
        match self {
            Element::Data(record) => record.get(column),
            Element::Start(meta) | Element::Stop(meta) => meta.get(column),
            Element::Error { meta, .. } => meta.get(column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_preserves_insertion_order() {
        let mut record = Record::new();
        record.insert("zulu", 1);
        record.insert("alpha", 2);
        record.insert("mike", 3);
        let order: Vec<&ColumnName> = record.columns().collect();
        assert_eq!(order, ["zulu", "alpha", "mike"]);
    }

    #[test]
    fn record_insert_keeps_position_on_replace() {
        let mut record = Record::from_pairs([("a", 1), ("b", 2), ("c", 3)]);
        record.insert("b", 20);
        let order: Vec<&ColumnName> = record.columns().collect();
        assert_eq!(order, ["a", "b", "c"]);
        assert_eq!(record.get("b"), Some(&Value::from(20)));
    }

    #[test]
    fn record_renders_as_json_object() {
        let record = Record::from_pairs([("key1", 1), ("key2", 2)]);
        assert_eq!(record.to_string(), r#"{"key1":1,"key2":2}"#);
    }

    #[test]
    fn element_column_reads_record_and_signal_metadata() {
        let data = Element::Data(Record::from_pairs([("x", 9)]));
        assert_eq!(data.column("x"), Some(&Value::from(9)));
        assert_eq!(data.column("y"), None);

        let mut meta = Metadata::new();
        meta.insert("epoch".to_string(), Value::from(3));
        let start = Element::Start(meta);
        assert_eq!(start.column("epoch"), Some(&Value::from(3)));
        assert!(start.is_signal());
    }

    #[test]
    fn record_equality_ignores_column_order() {
        let left = Record::from_pairs([("a", 1), ("b", 2)]);
        let right = Record::from_pairs([("b", 2), ("a", 1)]);
        assert_eq!(left, right);
    }
}
