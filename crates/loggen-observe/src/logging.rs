use tracing_subscriber::EnvFilter;

/// Initializes a `tracing_subscriber` using `LOGGEN_LOG` first, then `RUST_LOG`, then a default.
///
/// Log field contract for loggen components:
/// - Always include `source` and `dataset` on any per-task event.
/// - Include `batch_len` on flush events and `total_emitted` on drain events.
pub fn init_tracing() {
    let filter = env_filter();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("LOGGEN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
