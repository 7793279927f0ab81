//! Reusable demo runners shared by the `demos/` binaries.

use std::error::Error;

use clap::{error::ErrorKind, Parser};

use crate::consumer::{CollectingConsumer, Consumer, LogConsumer};
use crate::data::{Record, Value};
use crate::errors::PipelineError;
use crate::hybrid::HybridConsumer;
use crate::job::{RunOutcome, Task, Workflow};
use crate::multipath::MultiPathConsumer;
use crate::pipeline::Pipeline;
use crate::producer::{Producer, SerialProducer};
use crate::stage::Stage;
use crate::types::ColumnName;

/// Operand records in the shape the demo stages expect.
///
/// Each record carries `operand1 = 2i`, `operand2 = 2i + 1`, and an
/// `operand3` column the stages deliberately never look at.
pub fn demo_stream(length: usize) -> Vec<Record> {
    (0..length)
        .map(|i| {
            Record::from_pairs([
                ("operand1", Value::from(2 * i as i64)),
                ("operand2", Value::from(2 * i as i64 + 1)),
                ("operand3", Value::from("unnecessary data")),
            ])
        })
        .collect()
}

fn integer_column(record: &Record, column: &str) -> Result<i64, PipelineError> {
    record
        .get(column)
        .and_then(Value::as_i64)
        .ok_or_else(|| PipelineError::Failed(format!("column '{column}' is not an integer in {record}")))
}

/// Emits `sum = operand1 + operand2`.
pub struct SumStage {
    input_columns: Vec<ColumnName>,
}

impl SumStage {
    /// Create the stage with its fixed operand projection.
    pub fn new() -> Self {
        Self {
            input_columns: vec!["operand1".to_string(), "operand2".to_string()],
        }
    }
}

impl Default for SumStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for SumStage {
    fn name(&self) -> &str {
        "sum"
    }

    fn input_columns(&self) -> &[ColumnName] {
        &self.input_columns
    }

    fn process(&mut self, record: Record) -> Result<Vec<Record>, PipelineError> {
        let lhs = integer_column(&record, "operand1")?;
        let rhs = integer_column(&record, "operand2")?;
        tracing::info!(operand1 = lhs, operand2 = rhs, "sum stage");
        Ok(vec![Record::from_pairs([("sum", lhs + rhs)])])
    }
}

/// Emits `multiply = operand1 * operand2`.
pub struct MultiplyStage {
    input_columns: Vec<ColumnName>,
}

impl MultiplyStage {
    /// Create the stage with its fixed operand projection.
    pub fn new() -> Self {
        Self {
            input_columns: vec!["operand1".to_string(), "operand2".to_string()],
        }
    }
}

impl Default for MultiplyStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for MultiplyStage {
    fn name(&self) -> &str {
        "multiply"
    }

    fn input_columns(&self) -> &[ColumnName] {
        &self.input_columns
    }

    fn process(&mut self, record: Record) -> Result<Vec<Record>, PipelineError> {
        let lhs = integer_column(&record, "operand1")?;
        let rhs = integer_column(&record, "operand2")?;
        tracing::info!(operand1 = lhs, operand2 = rhs, "multiply stage");
        Ok(vec![Record::from_pairs([("multiply", lhs * rhs)])])
    }
}

fn demo_pipeline() -> Pipeline {
    Pipeline::new(SumStage::new(), &["operand1", "operand2"]).add_stage(
        MultiplyStage::new(),
        &["operand1", "operand2", "sum"],
    )
}

/// Fan-out demo: sum and multiply stages feeding logging and collecting
/// consumers.
pub struct SimpleDemoWorkflow {
    /// Length of the demo stream.
    pub length: usize,
}

impl Default for SimpleDemoWorkflow {
    fn default() -> Self {
        Self { length: 10 }
    }
}

impl Workflow for SimpleDemoWorkflow {
    fn producer(&mut self) -> Box<dyn Producer> {
        Box::new(SerialProducer::new(demo_stream(self.length)))
    }

    fn pipeline(&mut self) -> Pipeline {
        demo_pipeline()
    }

    fn consumer(&mut self) -> Box<dyn Consumer> {
        Box::new(
            HybridConsumer::new()
                .add_consumer(LogConsumer::new().with_name("results_log"))
                .add_consumer(
                    CollectingConsumer::new()
                        .with_name("results")
                        .with_required_columns(&["sum", "multiply"]),
                ),
        )
    }
}

/// Routing demo: the same pipeline, with records routed by whether
/// `operand1` is divisible by three.
pub struct MultipathDemoWorkflow {
    /// Length of the demo stream.
    pub length: usize,
}

impl Default for MultipathDemoWorkflow {
    fn default() -> Self {
        Self { length: 10 }
    }
}

impl Workflow for MultipathDemoWorkflow {
    fn producer(&mut self) -> Box<dyn Producer> {
        Box::new(SerialProducer::new(demo_stream(self.length)))
    }

    fn pipeline(&mut self) -> Pipeline {
        demo_pipeline()
    }

    fn consumer(&mut self) -> Box<dyn Consumer> {
        let route = |record: &Record| {
            record
                .get("operand1")
                .and_then(Value::as_i64)
                .map(|value| value % 3 == 0)
                .unwrap_or(false)
        };
        Box::new(
            MultiPathConsumer::new(route)
                .add_consumer(true, LogConsumer::new().with_name("divisible_by_three"))
                .add_consumer(
                    false,
                    HybridConsumer::new()
                        .add_consumer(LogConsumer::new().with_name("remainder"))
                        .add_consumer(
                            CollectingConsumer::new()
                                .with_name("remainder_records")
                                .with_required_columns(&["sum", "multiply"]),
                        ),
                ),
        )
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "simple_task_demo",
    disable_help_subcommand = true,
    about = "Run the fan-out task demo",
    long_about = "Stream operand records through sum and multiply stages into a fan-out consumer."
)]
struct SimpleTaskCli {
    #[arg(
        long,
        default_value_t = 10,
        value_parser = parse_positive_usize,
        help = "Length of the demo stream"
    )]
    length: usize,
}

#[derive(Debug, Parser)]
#[command(
    name = "multipath_demo",
    disable_help_subcommand = true,
    about = "Run the routing demo",
    long_about = "Stream operand records through sum and multiply stages, routing results by divisibility."
)]
struct MultipathCli {
    #[arg(
        long,
        default_value_t = 10,
        value_parser = parse_positive_usize,
        help = "Length of the demo stream"
    )]
    length: usize,
}

/// Run the fan-out task demo with CLI-style arguments.
pub fn run_simple_task_demo<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_demo_logging();
    let Some(cli) = parse_cli::<SimpleTaskCli, _>(
        std::iter::once("simple_task_demo".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };
    let mut workflow = SimpleDemoWorkflow { length: cli.length };
    finish(Task::new().run(&mut workflow))
}

/// Run the routing demo with CLI-style arguments.
pub fn run_multipath_demo<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_demo_logging();
    let Some(cli) = parse_cli::<MultipathCli, _>(
        std::iter::once("multipath_demo".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };
    let mut workflow = MultipathDemoWorkflow { length: cli.length };
    finish(Task::new().run(&mut workflow))
}

fn finish(outcome: RunOutcome) -> Result<(), Box<dyn Error>> {
    match outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Failed(err) => Err(err.into()),
    }
}

fn init_demo_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse --length value '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("--length must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_stream_shapes_operands() {
        let records = demo_stream(3);
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].get("operand1"), Some(&Value::from(4)));
        assert_eq!(records[2].get("operand2"), Some(&Value::from(5)));
        assert!(records[2].contains_column("operand3"));
    }

    #[test]
    fn parse_cli_treats_help_as_handled() {
        let parsed = parse_cli::<SimpleTaskCli, _>(["simple_task_demo", "--help"])
            .expect("help is not an error");
        assert!(parsed.is_none());
    }

    #[test]
    fn simple_demo_workflow_completes() {
        let task = Task::with_sink(Box::new(crate::events::MemorySink::new()));
        let outcome = task.process::<SimpleDemoWorkflow>();
        assert!(outcome.is_completed());
    }

    #[test]
    fn multipath_demo_workflow_completes() {
        let task = Task::with_sink(Box::new(crate::events::MemorySink::new()));
        let outcome = task.process::<MultipathDemoWorkflow>();
        assert!(outcome.is_completed());
    }
}
