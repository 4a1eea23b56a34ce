//! Top-level runtime error type.

use thiserror::Error;

use crate::config::ConfigError;
use relay_core::DispatchError;

/// Everything a [`Runtime`](crate::Runtime) run can fail with.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A critical handler failure surfaced from the run loop.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result type for runtime operations.
pub type RelayResult<T> = Result<T, RelayError>;
