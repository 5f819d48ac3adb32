use anyhow::Result;
use async_trait::async_trait;

use loggen_core::types::Event;

/// Delivery interface for `loggen-runtime`.
///
/// Delivery is best-effort: the emission loop logs and drops a failed batch,
/// so implementations should bound their request time (treat a timeout as a
/// send failure) rather than retry indefinitely.
#[async_trait]
pub trait BulkSink: Send + Sync + 'static {
    async fn send(&self, events: &[Event]) -> Result<()>;

    /// Advisory connectivity probe. A `false` result is logged, never fatal,
    /// because the runtime retries delivery continuously anyway.
    async fn ping(&self) -> bool;
}
