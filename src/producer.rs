//! Stream sources.
//!
//! A producer wraps a raw data source and emits a bracketed stream:
//! `Start`, the data, then `Stop`. `to_stream` is the only required
//! method; the bracketing is owned by the provided `stream`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter;
use std::path::Path;

use crate::data::{Element, ElementStream, Record, RecordStream};
use crate::errors::PipelineError;

/// Bracketed stream source contract.
pub trait Producer {
    /// Yield the raw data records of the stream.
    fn to_stream(&mut self) -> RecordStream<'_>;

    /// Full bracketed stream: `Start`, every record, then `Stop`.
    ///
    /// Lazy and single-pass; safe for unbounded sources only if
    /// `to_stream` terminates.
    fn stream(&mut self) -> ElementStream<'_> {
        let data = self
            .to_stream()
            .map(|result| result.map(Element::Data));
        Box::new(
            iter::once(Ok(Element::start()))
                .chain(data)
                .chain(iter::once(Ok(Element::stop()))),
        )
    }
}

/// Producer over a fixed sequence of records.
pub struct SerialProducer {
    records: Box<dyn Iterator<Item = Record>>,
}

impl SerialProducer {
    /// Wrap an owned record iterable.
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: 'static,
    {
        Self {
            records: Box::new(records.into_iter()),
        }
    }
}

impl Producer for SerialProducer {
    fn to_stream(&mut self) -> RecordStream<'_> {
        Box::new(self.records.by_ref().map(Ok))
    }
}

/// Producer for a stream of exactly one record.
pub struct SingleItemProducer {
    record: Option<Record>,
}

impl SingleItemProducer {
    /// Wrap the single record to produce.
    pub fn new(record: Record) -> Self {
        Self {
            record: Some(record),
        }
    }
}

impl Producer for SingleItemProducer {
    fn to_stream(&mut self) -> RecordStream<'_> {
        Box::new(self.record.take().into_iter().map(Ok))
    }
}

/// Producer that streams one JSON object per line as a record.
///
/// Blank lines are skipped. A line that is not a JSON object surfaces as a
/// `Decode` stream error, terminating the stream at the orchestrator.
pub struct JsonLinesProducer<R> {
    reader: R,
}

impl<R: BufRead> JsonLinesProducer<R> {
    /// Wrap a buffered reader of JSON Lines input.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl JsonLinesProducer<BufReader<File>> {
    /// Open a JSON Lines file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Producer for JsonLinesProducer<R> {
    fn to_stream(&mut self) -> RecordStream<'_> {
        Box::new((&mut self.reader).lines().filter_map(|line| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(serde_json::from_str::<Record>(&line).map_err(PipelineError::from)),
            Err(err) => Some(Err(PipelineError::from(err))),
        }))
    }
}
