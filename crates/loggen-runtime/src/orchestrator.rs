use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;

use loggen_core::catalog::Catalog;
use loggen_core::types::{GenKey, TaskStatus};
use loggen_observe::metrics::{Counter, Gauge};

use crate::sink::BulkSink;
use crate::task::{self, EmissionHandle};

pub const DEFAULT_BATCH_CAPACITY: usize = 10;
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Events accumulated before a bulk flush.
    pub batch_capacity: usize,
    /// Per-task bound on waiting for the drain flush during `stop_all`.
    pub drain_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

#[derive(Debug, Default)]
pub struct RuntimeMetrics {
    pub events_generated_total: Counter,
    pub batches_flushed_total: Counter,
    pub flush_failures_total: Counter,
    pub generator_failures_total: Counter,
    pub active_tasks: Gauge,
}

/// Concurrency-safe registry of emission tasks keyed by (source, dataset).
///
/// Every registry read and write happens under one mutex; no sink call is
/// ever made while it is held, so a slow sink for one key never stalls
/// start/stop/status for the others.
pub struct Orchestrator<S: BulkSink> {
    sink: Arc<S>,
    catalog: Catalog,
    config: OrchestratorConfig,
    metrics: Arc<RuntimeMetrics>,
    tasks: Mutex<BTreeMap<GenKey, EmissionHandle>>,
}

impl<S: BulkSink> Orchestrator<S> {
    pub fn new(catalog: Catalog, sink: Arc<S>, config: OrchestratorConfig) -> Self {
        Self {
            sink,
            catalog,
            config,
            metrics: Arc::new(RuntimeMetrics::default()),
            tasks: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn metrics(&self) -> Arc<RuntimeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Advisory connectivity probe at startup; a false result is not fatal.
    pub async fn ping_sink(&self) -> bool {
        self.sink.ping().await
    }

    /// Starts an emission task for `(source, dataset)` at `rate_per_second`.
    ///
    /// Returns false, with no side effect, for a pair absent from the catalog
    /// or for a key whose task is still running (draining counts as running).
    /// A stopped entry is replaced by a brand-new task with fresh counters,
    /// never resurrected.
    pub async fn start(&self, source: &str, dataset: &str, rate_per_second: f64) -> bool {
        let Some(spec) = self.catalog.resolve(source, dataset) else {
            tracing::debug!(source, dataset, "start rejected: unknown catalog pair");
            return false;
        };
        let factory = spec.factory;
        let key = GenKey::new(source, dataset);

        let mut tasks = self.tasks.lock().await;
        if tasks.get(&key).is_some_and(|t| t.is_running()) {
            tracing::debug!(source, dataset, "start rejected: already running");
            return false;
        }
        let handle = task::spawn(
            key.clone(),
            factory(),
            Arc::clone(&self.sink),
            rate_per_second,
            self.config.batch_capacity,
            Arc::clone(&self.metrics),
        );
        tasks.insert(key, handle);
        self.update_active_gauge(&tasks);
        true
    }

    /// Signals cancellation for the task registered under the key.
    ///
    /// Returns immediately without waiting for the drain; false if nothing is
    /// registered under the key. Signaling an already-stopped entry is a
    /// harmless no-op reported as true, matching the registry-presence check.
    pub async fn stop(&self, source: &str, dataset: &str) -> bool {
        let key = GenKey::new(source, dataset);
        let tasks = self.tasks.lock().await;
        let Some(handle) = tasks.get(&key) else {
            return false;
        };
        handle.signal_stop();
        tracing::info!(
            target: "loggen_events",
            event = "task_stopping",
            source = %key.source,
            dataset = %key.dataset,
            "stop requested"
        );
        true
    }

    /// Signals every registered task, then waits for each to drain under the
    /// per-task timeout. A task exceeding the bound is abandoned (its buffered
    /// events are lost) rather than blocking shutdown.
    pub async fn stop_all(&self) {
        let draining: Vec<(GenKey, tokio::task::JoinHandle<()>)> = {
            let mut tasks = self.tasks.lock().await;
            let mut draining = Vec::new();
            for (key, handle) in tasks.iter_mut() {
                handle.signal_stop();
                if let Some(join) = handle.take_join() {
                    draining.push((key.clone(), join));
                }
            }
            draining
        };

        for (key, join) in draining {
            if timeout(self.config.drain_timeout, join).await.is_err() {
                tracing::warn!(
                    target: "loggen_events",
                    event = "task_abandoned",
                    source = %key.source,
                    dataset = %key.dataset,
                    drain_timeout_ms = self.config.drain_timeout.as_millis() as u64,
                    "task failed to drain within the timeout; abandoning"
                );
            }
        }

        let tasks = self.tasks.lock().await;
        self.update_active_gauge(&tasks);
    }

    /// Point-in-time snapshot of every registered task, stopped ones included.
    pub async fn status(&self) -> BTreeMap<GenKey, TaskStatus> {
        let tasks = self.tasks.lock().await;
        self.update_active_gauge(&tasks);
        tasks.iter().map(|(k, h)| (k.clone(), h.status())).collect()
    }

    /// Removes a stopped entry from the registry, discarding its last known
    /// counters. Returns false for an absent or still-running key.
    pub async fn evict(&self, source: &str, dataset: &str) -> bool {
        let key = GenKey::new(source, dataset);
        let mut tasks = self.tasks.lock().await;
        match tasks.get(&key) {
            Some(handle) if !handle.is_running() => {
                tasks.remove(&key);
                true
            }
            _ => false,
        }
    }

    fn update_active_gauge(&self, tasks: &BTreeMap<GenKey, EmissionHandle>) {
        let running = tasks.values().filter(|h| h.is_running()).count() as u64;
        self.metrics.active_tasks.set(running);
    }
}
