//! Orchestration: workflows, tasks, and jobs.
//!
//! A [`Workflow`] supplies the three collaborators; the runners wire
//! `consumer.consume(pipeline.run(producer.stream()))` and own the
//! lifecycle contract: a start marker before `setup`, `teardown` on every
//! exit path, and a stop marker after it, success or failure. [`Task`]
//! reports failure as a returned [`RunOutcome`]; [`Job`] maps it to a
//! process exit code and leaves the actual exit to the outermost caller.

use std::process::ExitCode;

use crate::consumer::Consumer;
use crate::errors::PipelineError;
use crate::events::{EventSink, RunEvent, TracingSink};
use crate::pipeline::Pipeline;
use crate::producer::Producer;

/// Capability contract a run depends on.
///
/// `producer`, `pipeline`, and `consumer` are called once per run, in that
/// order, and may build fresh collaborators each time.
pub trait Workflow {
    /// Stream source for this run.
    fn producer(&mut self) -> Box<dyn Producer>;

    /// Stage chain for this run.
    fn pipeline(&mut self) -> Pipeline;

    /// Terminal consumer for this run.
    fn consumer(&mut self) -> Box<dyn Consumer>;

    /// Acquire run-level resources before the stream is wired.
    fn setup(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Release run-level resources. Runs on every exit path.
    fn teardown(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Explicit result of a run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The stream was fully consumed.
    Completed,
    /// The run failed; carries the propagated error.
    Failed(PipelineError),
}

impl RunOutcome {
    /// Returns `true` when the run completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }

    /// Returns `true` when the run failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }

    /// Convert into a plain result.
    pub fn into_result(self) -> Result<(), PipelineError> {
        match self {
            RunOutcome::Completed => Ok(()),
            RunOutcome::Failed(err) => Err(err),
        }
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            RunOutcome::Completed => ExitCode::SUCCESS,
            RunOutcome::Failed(_) => ExitCode::FAILURE,
        }
    }
}

/// Runner with a non-fatal failure policy.
///
/// A failed run is reported through the sink and returned as
/// [`RunOutcome::Failed`]; the process keeps running, which suits batch
/// and scheduled invocation where one task's failure must not kill the
/// host process.
pub struct Task {
    sink: Box<dyn EventSink>,
}

impl Task {
    /// Create a task runner reporting through [`TracingSink`].
    pub fn new() -> Self {
        Self {
            sink: Box::new(TracingSink),
        }
    }

    /// Create a task runner reporting through the given sink.
    pub fn with_sink(sink: Box<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Run a workflow to completion or failure.
    ///
    /// Emits `Started`, runs `setup` and the stream; on failure emits
    /// `Failed` with the error detail. `teardown` runs and `Stopped` is
    /// emitted on every path. A teardown failure after a successful run
    /// fails the run; after a failed run the original error wins and the
    /// teardown failure is logged.
    pub fn run(&self, workflow: &mut dyn Workflow) -> RunOutcome {
        self.sink.record(&RunEvent::started());
        let mut failure = drive(workflow).err();
        if let Some(err) = &failure {
            self.sink.record(&RunEvent::failed(err.to_string()));
        }
        if let Err(teardown_err) = workflow.teardown() {
            if failure.is_none() {
                self.sink.record(&RunEvent::failed(teardown_err.to_string()));
                failure = Some(teardown_err);
            } else {
                tracing::warn!(detail = %teardown_err, "teardown failed after run failure");
            }
        }
        self.sink.record(&RunEvent::stopped());
        match failure {
            None => RunOutcome::Completed,
            Some(err) => RunOutcome::Failed(err),
        }
    }

    /// Build a workflow from its `Default` and run it.
    pub fn process<W: Workflow + Default>(&self) -> RunOutcome {
        self.run(&mut W::default())
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}

/// Runner with a fatal failure policy.
///
/// Identical execution to [`Task`], but the outcome is mapped to a
/// process exit code: failure signals a non-zero exit. The process-exit
/// decision itself stays with the outermost caller, typically
/// `fn main() -> ExitCode`.
pub struct Job {
    task: Task,
}

impl Job {
    /// Create a job runner reporting through [`TracingSink`].
    pub fn new() -> Self {
        Self { task: Task::new() }
    }

    /// Create a job runner reporting through the given sink.
    pub fn with_sink(sink: Box<dyn EventSink>) -> Self {
        Self {
            task: Task::with_sink(sink),
        }
    }

    /// Run a workflow and map the outcome to an exit code.
    pub fn run(&self, workflow: &mut dyn Workflow) -> ExitCode {
        self.task.run(workflow).exit_code()
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

fn drive(workflow: &mut dyn Workflow) -> Result<(), PipelineError> {
    workflow.setup()?;
    let mut producer = workflow.producer();
    let mut pipeline = workflow.pipeline();
    let mut consumer = workflow.consumer();
    consumer.consume(pipeline.run(producer.stream()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::CollectingConsumer;
    use crate::data::Record;
    use crate::events::MemorySink;
    use crate::producer::SerialProducer;
    use crate::stage::{Filter, Stage};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Minimal workflow fixture with an optional failing stage.
    struct Fixture {
        fail: bool,
        torn_down: Arc<AtomicBool>,
    }

    impl Fixture {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                torn_down: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    /// Stage that fails on the first record.
    struct Explode;

    impl Stage for Explode {
        fn name(&self) -> &str {
            "explode"
        }

        fn process(&mut self, _record: Record) -> Result<Vec<Record>, PipelineError> {
            Err(PipelineError::Failed("stage exploded".to_string()))
        }
    }

    impl Workflow for Fixture {
        fn producer(&mut self) -> Box<dyn Producer> {
            Box::new(SerialProducer::new(vec![Record::from_pairs([("n", 1)])]))
        }

        fn pipeline(&mut self) -> Pipeline {
            if self.fail {
                Pipeline::new(Explode, &[])
            } else {
                Pipeline::new(Filter::new(&["n"]), &[])
            }
        }

        fn consumer(&mut self) -> Box<dyn Consumer> {
            Box::new(CollectingConsumer::new())
        }

        fn teardown(&mut self) -> Result<(), PipelineError> {
            self.torn_down.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn completed_run_emits_start_then_stop() {
        let sink = Arc::new(MemorySink::new());
        let task = Task::with_sink(Box::new(Arc::clone(&sink)));
        let mut workflow = Fixture::new(false);
        let outcome = task.run(&mut workflow);
        assert!(outcome.is_completed());
        let events = sink.snapshot();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], RunEvent::Started { .. }));
        assert!(matches!(events[1], RunEvent::Stopped { .. }));
    }

    #[test]
    fn failed_run_still_tears_down_and_stops() {
        let sink = Arc::new(MemorySink::new());
        let task = Task::with_sink(Box::new(Arc::clone(&sink)));
        let mut workflow = Fixture::new(true);
        let torn_down = Arc::clone(&workflow.torn_down);

        let outcome = task.run(&mut workflow);
        assert!(matches!(
            outcome,
            RunOutcome::Failed(PipelineError::Failed(ref msg)) if msg == "stage exploded"
        ));
        assert!(torn_down.load(Ordering::SeqCst));

        let events = sink.snapshot();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RunEvent::Started { .. }));
        assert!(events[1].is_failure());
        assert!(matches!(events[2], RunEvent::Stopped { .. }));
    }

    #[test]
    fn job_maps_outcomes_to_exit_codes() {
        let job = Job::with_sink(Box::new(MemorySink::new()));
        let ok = job.run(&mut Fixture::new(false));
        assert_eq!(format!("{ok:?}"), format!("{:?}", ExitCode::SUCCESS));
        let failed = job.run(&mut Fixture::new(true));
        assert_eq!(format!("{failed:?}"), format!("{:?}", ExitCode::FAILURE));
    }

    #[test]
    fn teardown_failure_fails_a_successful_run() {
        /// Workflow whose teardown fails.
        struct BadTeardown;

        impl Workflow for BadTeardown {
            fn producer(&mut self) -> Box<dyn Producer> {
                Box::new(SerialProducer::new(Vec::new()))
            }

            fn pipeline(&mut self) -> Pipeline {
                Pipeline::new(Filter::new(&[]), &[])
            }

            fn consumer(&mut self) -> Box<dyn Consumer> {
                Box::new(CollectingConsumer::new())
            }

            fn teardown(&mut self) -> Result<(), PipelineError> {
                Err(PipelineError::Failed("teardown exploded".to_string()))
            }
        }

        let task = Task::with_sink(Box::new(MemorySink::new()));
        let outcome = task.run(&mut BadTeardown);
        assert!(matches!(
            outcome,
            RunOutcome::Failed(PipelineError::Failed(ref msg)) if msg == "teardown exploded"
        ));
    }
}
