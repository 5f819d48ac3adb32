use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use loggen_core::catalog::EventGenerator;
use loggen_core::types::{Batch, GenKey, TaskState, TaskStatus};
use loggen_observe::metrics::Counter;

use crate::orchestrator::RuntimeMetrics;
use crate::sink::BulkSink;

/// State shared between one emission task and the orchestrator's registry.
///
/// `total_emitted` is written only by the task itself; `stop_requested` only
/// by the orchestrator; `running` is cleared by the task after the drain
/// flush, never on cancellation alone.
pub(crate) struct TaskShared {
    pub rate_per_second: f64,
    pub total_emitted: Counter,
    pub running: AtomicBool,
    pub stop_requested: AtomicBool,
}

pub(crate) struct EmissionHandle {
    shared: Arc<TaskShared>,
    cancel: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl EmissionHandle {
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Level-triggered: once signaled the task stays cancelled, and a
    /// concurrent status query sees `Stopping` before the drain finishes.
    pub fn signal_stop(&self) {
        self.shared.stop_requested.store(true, Ordering::Release);
        let _ = self.cancel.send(true);
    }

    pub fn take_join(&mut self) -> Option<JoinHandle<()>> {
        self.join.take()
    }

    pub fn status(&self) -> TaskStatus {
        let running = self.shared.running.load(Ordering::Acquire);
        let stopping = self.shared.stop_requested.load(Ordering::Acquire);
        let state = match (running, stopping) {
            (true, false) => TaskState::Running,
            (true, true) => TaskState::Stopping,
            (false, _) => TaskState::Stopped,
        };
        TaskStatus {
            state,
            rate_per_second: self.shared.rate_per_second,
            total_emitted: self.shared.total_emitted.get(),
        }
    }
}

pub(crate) fn spawn<S: BulkSink>(
    key: GenKey,
    generator: Box<dyn EventGenerator>,
    sink: Arc<S>,
    rate_per_second: f64,
    batch_capacity: usize,
    metrics: Arc<RuntimeMetrics>,
) -> EmissionHandle {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let shared = Arc::new(TaskShared {
        rate_per_second,
        total_emitted: Counter::default(),
        running: AtomicBool::new(true),
        stop_requested: AtomicBool::new(false),
    });
    let join = tokio::spawn(run_emission(
        key,
        generator,
        sink,
        Arc::clone(&shared),
        cancel_rx,
        batch_capacity,
        metrics,
    ));
    EmissionHandle {
        shared,
        cancel: cancel_tx,
        join: Some(join),
    }
}

/// The emission interval is `1/rate`; a non-positive or non-finite rate falls
/// back to one second instead of dividing by zero or running unthrottled.
fn emission_interval(rate_per_second: f64) -> Duration {
    if rate_per_second.is_finite() && rate_per_second > 0.0 {
        Duration::from_secs_f64(1.0 / rate_per_second)
    } else {
        Duration::from_secs(1)
    }
}

async fn run_emission<S: BulkSink>(
    key: GenKey,
    mut generator: Box<dyn EventGenerator>,
    sink: Arc<S>,
    shared: Arc<TaskShared>,
    mut cancel: watch::Receiver<bool>,
    batch_capacity: usize,
    metrics: Arc<RuntimeMetrics>,
) {
    let interval = emission_interval(shared.rate_per_second);
    let mut batch = Batch::new(batch_capacity);

    tracing::info!(
        target: "loggen_events",
        event = "task_started",
        source = %key.source,
        dataset = %key.dataset,
        rate_per_second = shared.rate_per_second,
        batch_capacity = batch.capacity() as u64,
        "emission task started"
    );

    while !*cancel.borrow() {
        match generator.generate() {
            Ok(event) => {
                batch.push(event);
                if batch.is_full() {
                    flush(&key, sink.as_ref(), &mut batch, &shared, &metrics).await;
                }
            }
            Err(err) => {
                metrics.generator_failures_total.inc();
                tracing::warn!(
                    target: "loggen_events",
                    event = "generator_error",
                    source = %key.source,
                    dataset = %key.dataset,
                    error = %err,
                    "generator call failed; backing off one interval"
                );
            }
        }
        if sleep_or_cancelled(interval, &mut cancel).await {
            break;
        }
    }

    // Drain: the final partial batch is flushed exactly once, even when
    // cancellation arrived mid-iteration.
    flush(&key, sink.as_ref(), &mut batch, &shared, &metrics).await;
    shared.running.store(false, Ordering::Release);
    tracing::info!(
        target: "loggen_events",
        event = "task_drained",
        source = %key.source,
        dataset = %key.dataset,
        total_emitted = shared.total_emitted.get(),
        "emission task drained"
    );
}

async fn flush<S: BulkSink>(
    key: &GenKey,
    sink: &S,
    batch: &mut Batch,
    shared: &TaskShared,
    metrics: &RuntimeMetrics,
) {
    if batch.is_empty() {
        return;
    }
    let events = batch.take();
    let batch_len = events.len() as u64;
    match sink.send(&events).await {
        Ok(()) => {
            metrics.batches_flushed_total.inc();
            tracing::debug!(
                target: "loggen_events",
                event = "batch_flushed",
                source = %key.source,
                dataset = %key.dataset,
                batch_len,
                "batch flushed"
            );
        }
        Err(err) => {
            metrics.flush_failures_total.inc();
            tracing::warn!(
                target: "loggen_events",
                event = "flush_failed",
                source = %key.source,
                dataset = %key.dataset,
                batch_len,
                error = %err,
                "bulk delivery failed; batch dropped"
            );
        }
    }
    // The counter tracks load offered, not load confirmed delivered, so it
    // advances whether or not the sink call succeeded.
    shared.total_emitted.inc_by(batch_len);
    metrics.events_generated_total.inc_by(batch_len);
}

/// Sleeps for `interval` unless cancellation arrives first.
/// Returns true when the loop should exit.
async fn sleep_or_cancelled(interval: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(interval) => *cancel.borrow(),
        changed = cancel.changed() => changed.is_err() || *cancel.borrow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_is_reciprocal_of_rate() {
        assert_eq!(emission_interval(5.0), Duration::from_millis(200));
        assert_eq!(emission_interval(0.5), Duration::from_secs(2));
    }

    #[test]
    fn degenerate_rates_fall_back_to_one_second() {
        assert_eq!(emission_interval(0.0), Duration::from_secs(1));
        assert_eq!(emission_interval(-3.0), Duration::from_secs(1));
        assert_eq!(emission_interval(f64::NAN), Duration::from_secs(1));
        assert_eq!(emission_interval(f64::INFINITY), Duration::from_secs(1));
    }
}
