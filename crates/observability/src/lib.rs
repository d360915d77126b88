//! Tracing and logging (shared setup).

/// Initialize process-wide tracing, with the output format taken from
/// `LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use tracing::{init_with, LogFormat, ParseLogFormatError};
