//! Core components for the beacon logging system.
//!
//! ### [`error`] - Error handling
//! One [`LogError`] variant per failure kind surfaced to callers, plus
//! [`IoResultExt`] for attaching the failing destination to IO errors.

pub mod error;

pub use error::{IoResultExt, LogError, LogResult};
