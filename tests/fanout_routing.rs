use std::sync::{Arc, Mutex};

use conveyor::{
    Consumer, Filter, HybridConsumer, Metadata, MultiPathConsumer, Pipeline, PipelineError,
    Producer, Record, SerialProducer, Stage, Value,
};

/// Consumer that journals its whole lifecycle into a shared log.
struct JournalConsumer {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl JournalConsumer {
    fn new(name: &str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                name: name.to_string(),
                log: Arc::clone(&log),
            },
            log,
        )
    }

    fn note(&self, entry: String) {
        self.log.lock().expect("journal poisoned").push(entry);
    }
}

impl Consumer for JournalConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, _meta: &Metadata) -> Result<(), PipelineError> {
        self.note("setup".to_string());
        Ok(())
    }

    fn process(&mut self, record: Record) -> Result<(), PipelineError> {
        self.note(format!("record:{record}"));
        Ok(())
    }

    fn teardown(&mut self, _meta: &Metadata) -> Result<(), PipelineError> {
        self.note("teardown".to_string());
        Ok(())
    }
}

fn numbered(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| Record::from_pairs([("n", i as i64)]))
        .collect()
}

#[test]
fn fanout_delivers_every_record_to_every_child_once() {
    let (first, first_log) = JournalConsumer::new("first");
    let (second, second_log) = JournalConsumer::new("second");

    let mut producer = SerialProducer::new(numbered(3));
    let mut hybrid = HybridConsumer::new()
        .add_consumer(first)
        .add_consumer(second);
    hybrid.consume(producer.stream()).expect("consume succeeds");

    // Whole-stream fan-out: one setup and one teardown per child per
    // stream, never a fresh lifecycle around every element.
    let expected = vec![
        "setup".to_string(),
        "record:{\"n\":0}".to_string(),
        "record:{\"n\":1}".to_string(),
        "record:{\"n\":2}".to_string(),
        "teardown".to_string(),
    ];
    assert_eq!(*first_log.lock().expect("journal poisoned"), expected);
    assert_eq!(*second_log.lock().expect("journal poisoned"), expected);
}

#[test]
fn nested_hybrid_consumers_keep_lifecycles_intact() {
    let (leaf, leaf_log) = JournalConsumer::new("leaf");
    let inner = HybridConsumer::new()
        .add_stage(Filter::new(&["n"]), &[])
        .add_consumer(leaf);

    let (sibling, sibling_log) = JournalConsumer::new("sibling");
    let mut outer = HybridConsumer::new()
        .add_consumer(inner)
        .add_consumer(sibling);

    let mut producer = SerialProducer::new(vec![Record::from_pairs([("n", 1), ("junk", 2)])]);
    outer.consume(producer.stream()).expect("consume succeeds");

    let leaf_entries = leaf_log.lock().expect("journal poisoned");
    assert_eq!(
        *leaf_entries,
        vec![
            "setup".to_string(),
            "record:{\"n\":1}".to_string(),
            "teardown".to_string(),
        ]
    );
    let sibling_entries = sibling_log.lock().expect("journal poisoned");
    assert_eq!(sibling_entries.len(), 3);
    assert!(sibling_entries[1].contains("junk"));
}

#[test]
fn hybrid_internal_pipeline_keeps_logged_columns() {
    /// Replaces each record with a `doubled` column.
    struct Double;

    impl Stage for Double {
        fn name(&self) -> &str {
            "double"
        }

        fn process(&mut self, record: Record) -> Result<Vec<Record>, PipelineError> {
            let n = record.get("n").and_then(Value::as_i64).unwrap_or(0);
            Ok(vec![Record::from_pairs([("doubled", 2 * n)])])
        }
    }

    let (child, log) = JournalConsumer::new("child");
    let mut hybrid = HybridConsumer::new()
        .add_stage(Double, &["n"])
        .add_consumer(child);
    let mut producer = SerialProducer::new(vec![Record::from_pairs([("n", 4)])]);
    hybrid.consume(producer.stream()).expect("consume succeeds");

    let entries = log.lock().expect("journal poisoned");
    assert_eq!(entries[1], "record:{\"doubled\":8,\"n\":4}");
}

fn route_by_divisibility(record: &Record) -> bool {
    record
        .get("k")
        .and_then(Value::as_i64)
        .map(|value| value % 3 == 0)
        .unwrap_or(false)
}

#[test]
fn routing_is_exclusive_per_record() {
    let (matched, matched_log) = JournalConsumer::new("matched");
    let (unmatched, unmatched_log) = JournalConsumer::new("unmatched");

    let mut router = MultiPathConsumer::new(route_by_divisibility)
        .add_consumer(true, matched)
        .add_consumer(false, unmatched);
    let mut producer = SerialProducer::new(vec![
        Record::from_pairs([("k", 9)]),
        Record::from_pairs([("k", 4)]),
    ]);
    router.consume(producer.stream()).expect("consume succeeds");

    let matched_entries = matched_log.lock().expect("journal poisoned");
    let unmatched_entries = unmatched_log.lock().expect("journal poisoned");
    assert_eq!(
        *matched_entries,
        vec![
            "setup".to_string(),
            "record:{\"k\":9}".to_string(),
            "teardown".to_string(),
        ]
    );
    assert_eq!(
        *unmatched_entries,
        vec![
            "setup".to_string(),
            "record:{\"k\":4}".to_string(),
            "teardown".to_string(),
        ]
    );
}

#[test]
fn unrouted_records_are_dropped_without_error() {
    let (only_child, log) = JournalConsumer::new("only");
    let mut router =
        MultiPathConsumer::new(route_by_divisibility).add_consumer(true, only_child);
    let mut producer = SerialProducer::new(vec![
        Record::from_pairs([("k", 4)]),
        Record::from_pairs([("k", 6)]),
    ]);
    router
        .consume(producer.stream())
        .expect("dropping is not an error");

    // Signals are broadcast so the child still brackets correctly; only
    // the routed record arrives.
    let entries = log.lock().expect("journal poisoned");
    assert_eq!(
        *entries,
        vec![
            "setup".to_string(),
            "record:{\"k\":6}".to_string(),
            "teardown".to_string(),
        ]
    );
}

#[test]
fn multipath_internal_pipeline_runs_before_routing() {
    /// Tags each record with whether `k` is divisible by three.
    struct Classify;

    impl Stage for Classify {
        fn name(&self) -> &str {
            "classify"
        }

        fn process(&mut self, mut record: Record) -> Result<Vec<Record>, PipelineError> {
            let divisible = record
                .get("k")
                .and_then(Value::as_i64)
                .map(|value| value % 3 == 0)
                .unwrap_or(false);
            record.insert("divisible", divisible);
            Ok(vec![record])
        }
    }

    let (matched, matched_log) = JournalConsumer::new("matched");
    let route = |record: &Record| {
        record
            .get("divisible")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };
    let mut router = MultiPathConsumer::new(route)
        .add_stage(Classify, &[])
        .add_consumer(true, matched);
    let mut producer = SerialProducer::new(vec![Record::from_pairs([("k", 9)])]);
    router.consume(producer.stream()).expect("consume succeeds");

    let entries = matched_log.lock().expect("journal poisoned");
    assert_eq!(entries.len(), 3);
    assert!(entries[1].contains("\"divisible\":true"));
}

#[test]
fn fanout_composes_with_a_pipeline_run() {
    let (child, log) = JournalConsumer::new("child");
    let mut producer = SerialProducer::new(numbered(2));
    let mut pipeline = Pipeline::new(Filter::new(&["n"]), &[]);
    let mut hybrid = HybridConsumer::new().add_consumer(child);
    hybrid
        .consume(pipeline.run(producer.stream()))
        .expect("consume succeeds");
    assert_eq!(log.lock().expect("journal poisoned").len(), 4);
}
