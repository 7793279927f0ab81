//! Column-projecting transform stages.
//!
//! Ownership model:
//! - `Stage` is the pipeline-facing transform contract, driven by the
//!   lifecycle signals of a bracketed stream.
//! - `apply` owns the per-element algorithm (capture logged columns,
//!   project input, dispatch, project output) so pull-mode `run` and the
//!   element-wise delivery used by fan-out consumers share one code path.

use std::collections::VecDeque;

use crate::data::{Element, ElementStream, Metadata, Record, Value};
use crate::errors::PipelineError;
use crate::types::{ColumnName, StageName};

/// Pipeline-facing transform contract.
///
/// A stage sees a bracketed stream one element at a time: `Start` drives
/// `setup`, `Stop` drives `teardown`, data records drive `process`, and
/// `Error` elements pass through untouched. The default `setup` and
/// `teardown` emit one `Start` and one `Stop`, so a stage that only
/// overrides `process` preserves stream bracketing automatically.
///
/// Projection: `input_columns` narrows what `process` sees (absent columns
/// fail the stream), `output_columns` restricts what the stage emits, and
/// the pipeline's logged columns are merged on top of every output so
/// upstream columns survive regardless of the stage's own projection.
pub trait Stage {
    /// Stable stage identifier used in pipeline names and projection errors.
    fn name(&self) -> &str;

    /// Columns `process` receives; empty means no input projection.
    fn input_columns(&self) -> &[ColumnName] {
        &[]
    }

    /// Columns the stage emits; empty means no output projection.
    fn output_columns(&self) -> &[ColumnName] {
        &[]
    }

    /// Handle the head-of-stream signal.
    ///
    /// Emits the `Start` unchanged by default. Overrides may allocate
    /// resources and emit additional elements, but must keep exactly one
    /// `Start` at the head of what they emit.
    fn setup(&mut self, meta: &Metadata) -> Result<Vec<Element>, PipelineError> {
        Ok(vec![Element::Start(meta.clone())])
    }

    /// Transform one record into zero or more records.
    fn process(&mut self, record: Record) -> Result<Vec<Record>, PipelineError>;

    /// Handle the tail-of-stream signal.
    ///
    /// Emits the `Stop` unchanged by default. Overrides typically flush
    /// buffered records first and must keep exactly one `Stop` at the tail.
    fn teardown(&mut self, meta: &Metadata) -> Result<Vec<Element>, PipelineError> {
        Ok(vec![Element::Stop(meta.clone())])
    }

    /// Restrict an incoming element to `input_columns`.
    ///
    /// Signals pass unchanged. With no declared input columns the record
    /// passes through; otherwise the result contains exactly the declared
    /// columns, failing with `MissingColumn` when one is absent.
    fn project_input(&self, element: Element) -> Result<Element, PipelineError> {
        let record = match element {
            Element::Data(record) => record,
            signal => return Ok(signal),
        };
        if self.input_columns().is_empty() {
            return Ok(Element::Data(record));
        }
        restrict(&record, self.input_columns(), self.name()).map(Element::Data)
    }

    /// Build an outgoing element from a handler output and the logged
    /// columns captured from the incoming element.
    ///
    /// Signals pass unchanged. Data is restricted to `output_columns` when
    /// declared, then the logged pairs are merged on top: logged columns
    /// always survive projection and override same-named stage output.
    fn project_output(
        &self,
        element: Element,
        logged: &[(ColumnName, Value)],
    ) -> Result<Element, PipelineError> {
        let record = match element {
            Element::Data(record) => record,
            signal => return Ok(signal),
        };
        let mut out = if self.output_columns().is_empty() {
            record
        } else {
            restrict(&record, self.output_columns(), self.name())?
        };
        for (column, value) in logged {
            out.insert(column.clone(), value.clone());
        }
        Ok(Element::Data(out))
    }

    /// Run one element through the stage.
    ///
    /// Logged columns are captured from the incoming element before input
    /// projection; columns absent upstream are skipped. Dispatch:
    /// `Start -> setup`, `Stop -> teardown`, `Error -> pass through`,
    /// data `-> process`. Every produced element is output-projected with
    /// the captured logged pairs.
    fn apply(
        &mut self,
        element: Element,
        logged_columns: &[ColumnName],
    ) -> Result<Vec<Element>, PipelineError> {
        let logged: Vec<(ColumnName, Value)> = logged_columns
            .iter()
            .filter_map(|column| {
                element
                    .column(column)
                    .map(|value| (column.clone(), value.clone()))
            })
            .collect();
        let produced = match self.project_input(element)? {
            Element::Start(meta) => self.setup(&meta)?,
            Element::Stop(meta) => self.teardown(&meta)?,
            error @ Element::Error { .. } => vec![error],
            Element::Data(record) => self
                .process(record)?
                .into_iter()
                .map(Element::Data)
                .collect(),
        };
        produced
            .into_iter()
            .map(|out| self.project_output(out, &logged))
            .collect()
    }

    /// Lazily run a whole stream through the stage.
    ///
    /// Pulls one upstream element per downstream demand burst and buffers
    /// only that element's outputs, so memory stays bounded for handlers
    /// that yield O(1) elements. The returned stream is single-use and
    /// fuses after the first error.
    fn run<'a>(
        &'a mut self,
        source: ElementStream<'a>,
        logged_columns: &'a [ColumnName],
    ) -> ElementStream<'a> {
        Box::new(StageRun {
            stage: self,
            source,
            logged_columns,
            pending: VecDeque::new(),
            done: false,
        })
    }
}

/// Restrict `record` to exactly `columns`, failing on the first absence.
fn restrict(
    record: &Record,
    columns: &[ColumnName],
    stage: &str,
) -> Result<Record, PipelineError> {
    let mut out = Record::new();
    for column in columns {
        let value = record
            .get(column)
            .ok_or_else(|| PipelineError::MissingColumn {
                stage: stage.to_string(),
                column: column.clone(),
            })?;
        out.insert(column.clone(), value.clone());
    }
    Ok(out)
}

/// Lazy pull adapter over `Stage::apply`.
struct StageRun<'a, S: Stage + ?Sized> {
    stage: &'a mut S,
    source: ElementStream<'a>,
    logged_columns: &'a [ColumnName],
    pending: VecDeque<Element>,
    done: bool,
}

impl<S: Stage + ?Sized> Iterator for StageRun<'_, S> {
    type Item = Result<Element, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(element) = self.pending.pop_front() {
                return Some(Ok(element));
            }
            if self.done {
                return None;
            }
            match self.source.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                Some(Ok(element)) => match self.stage.apply(element, self.logged_columns) {
                    Ok(produced) => self.pending.extend(produced),
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                },
            }
        }
    }
}

/// Column-restricting passthrough stage.
///
/// Declares the given `output_columns` and passes every record through,
/// narrowing the stream to exactly those columns.
pub struct Filter {
    name: StageName,
    output_columns: Vec<ColumnName>,
}

impl Filter {
    /// Create a filter that keeps exactly `output_columns`.
    pub fn new(output_columns: &[&str]) -> Self {
        Self {
            name: "filter".to_string(),
            output_columns: output_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Override the stage name.
    pub fn with_name(mut self, name: impl Into<StageName>) -> Self {
        self.name = name.into();
        self
    }
}

impl Stage for Filter {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_columns(&self) -> &[ColumnName] {
        &self.output_columns
    }

    fn process(&mut self, record: Record) -> Result<Vec<Record>, PipelineError> {
        Ok(vec![record])
    }
}
