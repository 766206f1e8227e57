//! Crate error types
//!
//! The interceptor is a thin relay: it performs no retries and no local
//! recovery. Failures reported by the underlying writer propagate out
//! unchanged, and a transform that never resolves simply leaves the response
//! unfinished.

use thiserror::Error;

/// Errors surfaced while relaying a response.
#[derive(Debug, Error)]
pub enum TamperError {
    /// Transport-level failure reported by the underlying writer.
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A downstream middleware or endpoint failed.
    #[error("handler failed: {0}")]
    Handler(String),
}
