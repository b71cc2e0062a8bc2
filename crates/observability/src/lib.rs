//! Process-wide logging setup.

/// Initialize tracing for the process at the default `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_DIRECTIVE);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
