#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Terminal sink contracts and built-in consumers.
pub mod consumer;
/// Core record, signal, and stream types.
pub mod data;
/// Reusable demo runners shared by the `demos/` binaries.
pub mod demo_apps;
/// Run lifecycle events and sinks.
pub mod events;
/// Fan-out consumer.
pub mod hybrid;
/// Orchestration: workflows, tasks, and jobs.
pub mod job;
/// Routing consumer.
pub mod multipath;
/// Ordered stage composition.
pub mod pipeline;
/// Stream sources.
pub mod producer;
/// Column-projecting transform stages.
pub mod stage;
/// Shared type aliases.
pub mod types;

mod errors;

pub use consumer::{CollectingConsumer, Consumer, LogConsumer};
pub use data::{Element, ElementStream, Metadata, Record, RecordStream, Value};
pub use errors::PipelineError;
pub use events::{EventSink, MemorySink, RunEvent, TracingSink};
pub use hybrid::HybridConsumer;
pub use job::{Job, RunOutcome, Task, Workflow};
pub use multipath::MultiPathConsumer;
pub use pipeline::{Pipeline, StageDescriptor};
pub use producer::{JsonLinesProducer, Producer, SerialProducer, SingleItemProducer};
pub use stage::{Filter, Stage};
pub use types::{ColumnName, ConsumerName, LogMessage, StageName};
