//! Tracing/logging setup shared by every PeopleOps process.

use tracing_subscriber::EnvFilter;

/// Initialize process-wide tracing/logging.
///
/// Safe to call multiple times; subsequent calls are no-ops. Output is JSON
/// with timestamps, filtered via `RUST_LOG` (default `info`). Denial and
/// oracle-unreachable events land here at `warn`/`error`, which is the
/// operator's primary debugging surface for access issues.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init();
}
