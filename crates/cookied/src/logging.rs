//! Log output for the cookied programs.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: human-readable lines on stderr,
/// filtered by `RUST_LOG` (default `info`).
///
/// Stderr keeps stdout free for the one value each tool prints. Calling
/// this twice is harmless; the second call is ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
