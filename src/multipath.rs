//! Routing consumer.

use std::hash::Hash;

use indexmap::IndexMap;

use crate::consumer::Consumer;
use crate::data::{Element, Record};
use crate::errors::PipelineError;
use crate::pipeline::Pipeline;
use crate::stage::Stage;
use crate::types::ConsumerName;

/// Consumer that routes each record to exactly one of several child
/// consumers via a routing function, optionally pre-processing the stream
/// through an internal pipeline.
///
/// The route-key domain is caller-defined: booleans, strings, integers,
/// anything `Eq + Hash`. A record whose key has no entry in the route
/// table is dropped silently. Lifecycle signals are not routed; they are
/// broadcast to every routed consumer so each child sees a well-formed
/// bracketed stream.
pub struct MultiPathConsumer<K> {
    name: ConsumerName,
    consumers: IndexMap<K, Box<dyn Consumer>>,
    route: Box<dyn Fn(&Record) -> K>,
    pipeline: Option<Pipeline>,
}

impl<K: Eq + Hash> MultiPathConsumer<K> {
    /// Create a routing consumer with the given routing function and an
    /// empty route table.
    pub fn new(route: impl Fn(&Record) -> K + 'static) -> Self {
        Self {
            name: "multipath".to_string(),
            consumers: IndexMap::new(),
            route: Box::new(route),
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

    /// Register a consumer for `route_key`, replacing any previous entry.
    pub fn add_consumer(mut self, route_key: K, consumer: impl Consumer + 'static) -> Self {
        self.consumers.insert(route_key, Box::new(consumer));
        self
    }

    /// Number of routed consumers.
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }
}

impl<K: Eq + Hash> Consumer for MultiPathConsumer<K> {
    fn name(&self) -> &str {
        &self.name
    }

    /// Never dispatched: `accept` routes records to the children.
    fn process(&mut self, _record: Record) -> Result<(), PipelineError> {
        Ok(())
    }

    fn accept(&mut self, element: Element) -> Result<(), PipelineError> {
        let produced = match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.push(element)?,
            None => vec![element],
        };
        for element in produced {
            match element {
                Element::Data(record) => {
                    let key = (self.route)(&record);
                    match self.consumers.get_mut(&key) {
                        Some(consumer) => consumer.accept(Element::Data(record))?,
                        None => {
                            tracing::debug!(
                                consumer = self.name.as_str(),
                                record = %record,
                                "no route for record; dropping"
                            );
                        }
                    }
                }
                signal => {
                    for consumer in self.consumers.values_mut() {
                        consumer.accept(signal.clone())?;
                    }
                }
            }
        }
        Ok(())
    }
}
