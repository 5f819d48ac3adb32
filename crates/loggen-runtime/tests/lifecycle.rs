use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use loggen_core::catalog::{Catalog, DatasetSpec, EventGenerator, GeneratorError, SourceSpec};
use loggen_core::types::{Event, GenKey, TaskState};
use loggen_runtime::orchestrator::{Orchestrator, OrchestratorConfig};
use loggen_runtime::sink::BulkSink;

struct CountingSink {
    delivered_events: AtomicU64,
    delivered_batches: AtomicU64,
}

impl CountingSink {
    fn new() -> Self {
        Self {
            delivered_events: AtomicU64::new(0),
            delivered_batches: AtomicU64::new(0),
        }
    }

    fn events(&self) -> u64 {
        self.delivered_events.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BulkSink for CountingSink {
    async fn send(&self, events: &[Event]) -> Result<()> {
        self.delivered_batches.fetch_add(1, Ordering::Relaxed);
        self.delivered_events
            .fetch_add(events.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}

struct SeqGenerator {
    seq: u64,
}

impl EventGenerator for SeqGenerator {
    fn generate(&mut self) -> Result<Event, GeneratorError> {
        self.seq += 1;
        Ok(Event::new(
            json!({ "seq": self.seq }),
            "logs-test.stream-default",
        ))
    }
}

fn new_seq_generator() -> Box<dyn EventGenerator> {
    Box::new(SeqGenerator { seq: 0 })
}

fn test_catalog() -> Catalog {
    Catalog::new(vec![SourceSpec {
        source: "test",
        description: "synthetic test source",
        datasets: vec![DatasetSpec {
            dataset: "stream",
            description: "sequential documents",
            data_stream: "logs-test.stream-default",
            factory: new_seq_generator,
        }],
    }])
}

fn orchestrator(
    sink: Arc<CountingSink>,
    config: OrchestratorConfig,
) -> Orchestrator<CountingSink> {
    Orchestrator::new(test_catalog(), sink, config)
}

async fn wait_until_stopped(
    orch: &Orchestrator<CountingSink>,
    key: &GenKey,
    within: Duration,
) -> bool {
    let deadline = Instant::now() + within;
    loop {
        let status = orch.status().await;
        if status.get(key).is_some_and(|s| !s.is_running()) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_unknown_pair_is_rejected() {
    let orch = orchestrator(Arc::new(CountingSink::new()), OrchestratorConfig::default());

    assert!(!orch.start("unknown_source", "x", 1.0).await);
    assert!(!orch.start("test", "nope", 1.0).await);

    assert!(orch.status().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_then_status_shows_running() {
    let orch = orchestrator(Arc::new(CountingSink::new()), OrchestratorConfig::default());

    assert!(orch.start("test", "stream", 5.0).await);

    let status = orch.status().await;
    let entry = status.get(&GenKey::new("test", "stream")).unwrap();
    assert_eq!(entry.state, TaskState::Running);
    assert!(entry.is_running());
    assert_eq!(entry.rate_per_second, 5.0);

    orch.stop_all().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_start_is_rejected() {
    let orch = orchestrator(Arc::new(CountingSink::new()), OrchestratorConfig::default());

    assert!(orch.start("test", "stream", 10.0).await);
    assert!(!orch.start("test", "stream", 10.0).await);

    assert_eq!(orch.status().await.len(), 1);
    orch.stop_all().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_have_exactly_one_winner() {
    let orch = Arc::new(orchestrator(
        Arc::new(CountingSink::new()),
        OrchestratorConfig::default(),
    ));

    let mut joins = Vec::new();
    for _ in 0..8 {
        let orch = Arc::clone(&orch);
        joins.push(tokio::spawn(
            async move { orch.start("test", "stream", 20.0).await },
        ));
    }

    let mut winners = 0;
    for join in joins {
        if join.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(orch.status().await.len(), 1);

    orch.stop_all().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_unregistered_key_is_rejected() {
    let orch = orchestrator(Arc::new(CountingSink::new()), OrchestratorConfig::default());

    assert!(!orch.stop("test", "stream").await);
    assert!(orch.status().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_drains_final_partial_batch_exactly_once() {
    let sink = Arc::new(CountingSink::new());
    let config = OrchestratorConfig {
        batch_capacity: 4,
        ..Default::default()
    };
    let orch = orchestrator(Arc::clone(&sink), config);
    let key = GenKey::new("test", "stream");

    assert!(orch.start("test", "stream", 200.0).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(orch.stop("test", "stream").await);
    assert!(wait_until_stopped(&orch, &key, Duration::from_secs(2)).await);

    let status = orch.status().await;
    let entry = status.get(&key).unwrap();
    assert_eq!(entry.state, TaskState::Stopped);
    assert!(entry.total_emitted > 0, "nothing was generated");
    // Every generated event was handed to the sink, including the final
    // partial batch flushed on drain.
    assert_eq!(sink.events(), entry.total_emitted);

    // No further sink calls occur after drain completes.
    let settled = sink.events();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(sink.events(), settled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_builds_a_fresh_task_with_zeroed_counters() {
    let sink = Arc::new(CountingSink::new());
    // Capacity large enough that nothing flushes mid-run; only the drain
    // flush moves the counter.
    let config = OrchestratorConfig {
        batch_capacity: 1000,
        ..Default::default()
    };
    let orch = orchestrator(Arc::clone(&sink), config);
    let key = GenKey::new("test", "stream");

    assert!(orch.start("test", "stream", 100.0).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(orch.stop("test", "stream").await);
    assert!(wait_until_stopped(&orch, &key, Duration::from_secs(2)).await);

    let first_total = orch.status().await.get(&key).unwrap().total_emitted;
    assert!(first_total > 0);

    // Restart is allowed and must not resume the old counters.
    assert!(orch.start("test", "stream", 100.0).await);
    let status = orch.status().await;
    let entry = status.get(&key).unwrap();
    assert_eq!(entry.state, TaskState::Running);
    assert_eq!(entry.total_emitted, 0);

    orch.stop_all().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn evict_removes_only_stopped_entries() {
    let orch = orchestrator(Arc::new(CountingSink::new()), OrchestratorConfig::default());
    let key = GenKey::new("test", "stream");

    assert!(!orch.evict("test", "stream").await);

    assert!(orch.start("test", "stream", 50.0).await);
    assert!(!orch.evict("test", "stream").await, "running task evicted");

    assert!(orch.stop("test", "stream").await);
    assert!(wait_until_stopped(&orch, &key, Duration::from_secs(2)).await);

    // A stopped task's counters stay queryable until evicted.
    assert!(orch.status().await.contains_key(&key));
    assert!(orch.evict("test", "stream").await);
    assert!(!orch.status().await.contains_key(&key));
    assert!(!orch.evict("test", "stream").await);
}
