//! Convenience result type alias for WebObs.

use crate::error::AppError;

/// A specialized `Result` type for WebObs operations.
pub type AppResult<T> = Result<T, AppError>;
