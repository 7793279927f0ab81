//! Fan-out consumer.

use crate::consumer::Consumer;
use crate::data::{Element, Record};
use crate::errors::PipelineError;
use crate::pipeline::Pipeline;
use crate::stage::Stage;
use crate::types::ConsumerName;

/// Consumer that broadcasts every element to a list of child consumers,
/// optionally pre-processing the stream through an internal pipeline.
///
/// Delivery is per-element dispatch into each child's `accept`, so every
/// child observes the whole stream with its bracketing intact: exactly one
/// `setup` and one `teardown` per stream, and every record in stream
/// order. The internal pipeline runs element-wise, keeping stage state
/// alive across the whole stream.
pub struct HybridConsumer {
    name: ConsumerName,
    consumers: Vec<Box<dyn Consumer>>,
    pipeline: Option<Pipeline>,
}

impl HybridConsumer {
    /// Create a fan-out consumer with no children and no pipeline.
    pub fn new() -> Self {
        Self {
            name: "hybrid".to_string(),
            consumers: Vec::new(),
            pipeline: None,
        }
    }

    /// Override the consumer name.
    pub fn with_name(mut self, name: impl Into<ConsumerName>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the internal pipeline wholesale.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Append a stage to the internal pipeline, creating it if absent.
    pub fn add_stage(mut self, stage: impl Stage + 'static, logged_columns: &[&str]) -> Self {
        self.pipeline = Some(match self.pipeline.take() {
            Some(pipeline) => pipeline.add_stage(stage, logged_columns),
            None => Pipeline::new(stage, logged_columns),
        });
        self
    }

    /// Append a child consumer.
    pub fn add_consumer(mut self, consumer: impl Consumer + 'static) -> Self {
        self.consumers.push(Box::new(consumer));
        self
    }

    /// Number of child consumers.
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }
}

impl Default for HybridConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl Consumer for HybridConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    /// Never dispatched: `accept` fans elements out to the children.
    fn process(&mut self, _record: Record) -> Result<(), PipelineError> {
        Ok(())
    }

    fn accept(&mut self, element: Element) -> Result<(), PipelineError> {
        let produced = match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.push(element)?,
            None => vec![element],
        };
        for element in produced {
            for consumer in &mut self.consumers {
                consumer.accept(element.clone())?;
            }
        }
        Ok(())
    }
}
