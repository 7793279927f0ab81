/// Name of a record column (string key).
/// Examples: `operand1`, `sum`, `key1`
pub type ColumnName = String;
/// Identifier for a stage, used in pipeline names and projection errors.
/// Examples: `sum`, `filter`, `Pipeline:sum:multiply`
pub type StageName = String;
/// Identifier for a consumer, used in validation errors and traces.
/// Examples: `collector`, `hybrid`, `sum_log`
pub type ConsumerName = String;
/// Rendered log/event message text.
/// Examples: `start`, `stage 'sum' requires column 'operand1' which is absent from the record`
pub type LogMessage = String;
