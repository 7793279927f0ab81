use std::io;

use thiserror::Error;

use crate::data::Record;
use crate::types::{ColumnName, ConsumerName, StageName};

/// Error type for projection, validation, user-code, and IO failures.
///
/// Stages and consumers never catch each other's failures. An error raised
/// anywhere in a stream rides the stream unmodified up to the orchestrator,
/// which is the single recovery point.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("stage '{stage}' requires column '{column}' which is absent from the record")]
    MissingColumn { stage: StageName, column: ColumnName },
    #[error("consumer '{consumer}' is missing required columns {missing:?} in record {record}")]
    MissingRequiredColumns {
        consumer: ConsumerName,
        missing: Vec<ColumnName>,
        record: Record,
    },
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("record decode failure: {0}")]
    Decode(#[from] serde_json::Error),
}
