//! Structured error types for launch-scope
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! None of these errors reach the public query surface: every platform
//! failure degrades to a documented default (epoch 0, name "unknown", empty
//! result). The typed errors exist so the degradation can be logged with a
//! reason attached.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("process start time unavailable: {0}")]
    ProcessStartUnavailable(String),

    #[error("monotonic clock rate descriptor unavailable: {0}")]
    ClockBasisUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
