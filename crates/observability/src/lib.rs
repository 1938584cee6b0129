//! Process-wide logging setup shared by the binaries.

/// Initialize JSON tracing output.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init(DEFAULT_DIRECTIVES);
}

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

pub mod tracing;
