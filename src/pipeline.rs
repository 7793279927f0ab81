//! Ordered stage composition.
//!
//! A pipeline threads one stage's output stream into the next, strictly
//! sequentially. It supports two execution modes over the same stages:
//! lazy pull (`run`) for whole streams, and element-wise push (`push`)
//! used by fan-out/routing consumers that deliver elements one at a time
//! while keeping stage state alive across the whole stream.

use crate::data::{Element, ElementStream};
use crate::errors::PipelineError;
use crate::stage::Stage;
use crate::types::{ColumnName, StageName};

/// A stage plus the upstream columns to carry through untouched regardless
/// of the stage's own projection.
pub struct StageDescriptor {
    stage: Box<dyn Stage>,
    logged_columns: Vec<ColumnName>,
}

impl StageDescriptor {
    /// Name of the wrapped stage.
    pub fn stage_name(&self) -> &str {
        self.stage.name()
    }

    /// Columns forcibly preserved through this stage's projection.
    pub fn logged_columns(&self) -> &[ColumnName] {
        &self.logged_columns
    }
}

/// Ordered chain of stages; order is execution order.
///
/// Nesting a `Pipeline` inside a `Pipeline` is unsupported by construction:
/// `Pipeline` does not implement [`Stage`], so it can never be added as one.
pub struct Pipeline {
    name: StageName,
    stages: Vec<StageDescriptor>,
}

impl Pipeline {
    /// Create a pipeline with one initial stage.
    ///
    /// `logged_columns` names the upstream columns to carry through the
    /// stage untouched; pass `&[]` for none.
    pub fn new(stage: impl Stage + 'static, logged_columns: &[&str]) -> Self {
        let name = format!("Pipeline:{}", stage.name());
        Self {
            name,
            stages: vec![descriptor(stage, logged_columns)],
        }
    }

    /// Append a stage, concatenating its name onto the pipeline name.
    pub fn add_stage(self, stage: impl Stage + 'static, logged_columns: &[&str]) -> Self {
        let name = stage.name().to_string();
        self.add_stage_named(stage, logged_columns, name)
    }

    /// Append a stage under an explicit name in the pipeline name chain.
    pub fn add_stage_named(
        mut self,
        stage: impl Stage + 'static,
        logged_columns: &[&str],
        name: impl Into<StageName>,
    ) -> Self {
        self.name = format!("{}:{}", self.name, name.into());
        self.stages.push(descriptor(stage, logged_columns));
        self
    }

    /// Concatenated pipeline name, e.g. `Pipeline:sum:multiply`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stages in the pipeline.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` when the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage descriptors in execution order.
    pub fn stages(&self) -> impl Iterator<Item = &StageDescriptor> {
        self.stages.iter()
    }

    /// Lazily run a whole stream through every stage in order.
    ///
    /// Folds `source = stage.run(source, logged_columns)` across the
    /// descriptors; no stage executes until the result is pulled.
    pub fn run<'a>(&'a mut self, source: ElementStream<'a>) -> ElementStream<'a> {
        let mut stream = source;
        for descriptor in self.stages.iter_mut() {
            let StageDescriptor {
                stage,
                logged_columns,
            } = descriptor;
            stream = stage.run(stream, logged_columns.as_slice());
        }
        stream
    }

    /// Run one element through every stage in order.
    ///
    /// Stage state persists across calls, so feeding a bracketed stream
    /// element by element is equivalent to `run` over the same stream.
    pub fn push(&mut self, element: Element) -> Result<Vec<Element>, PipelineError> {
        let mut current = vec![element];
        for descriptor in self.stages.iter_mut() {
            let mut produced = Vec::new();
            for element in current {
                produced.extend(
                    descriptor
                        .stage
                        .apply(element, &descriptor.logged_columns)?,
                );
            }
            current = produced;
        }
        Ok(current)
    }
}

fn descriptor(stage: impl Stage + 'static, logged_columns: &[&str]) -> StageDescriptor {
    StageDescriptor {
        stage: Box::new(stage),
        logged_columns: logged_columns.iter().map(|c| c.to_string()).collect(),
    }
}
