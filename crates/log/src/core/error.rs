//! Error handling for beacon-log
//!
//! Contract violations (bad levels, empty handler lists, wrong option shapes)
//! are returned synchronously as [`LogError`]. Advisory conditions never reach
//! this type; they go through [`crate::diagnostics`].

use std::io;

/// Result type for logging operations
pub type LogResult<T> = Result<T, LogError>;

/// Errors returned by loggers and handlers
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Malformed construction or call argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Name that is not one of the eight PSR-3 level names
    #[error("invalid level name: '{0}'")]
    InvalidLevelName(String),

    /// A value or configured callable has the wrong shape
    #[error("type error: {0}")]
    Type(String),

    /// Removing a handler would leave the logger without any
    #[error("underflow: {0}")]
    Underflow(String),

    /// An operation expecting at least one handler received none
    #[error("argument count: {0}")]
    ArgumentCount(String),

    /// Opening or writing a destination failed
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Destination that failed
        path: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Configuration could not be turned into a logger
    #[error("configuration error: {0}")]
    Config(String),
}

impl LogError {
    /// Create an IO error for the given destination
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Destination path carried by an IO error
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Io { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether this error came from the IO layer
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Extension trait for IO results that belong to a destination
pub trait IoResultExt<T> {
    /// Convert into [`LogResult`], recording the failing path
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Io`] carrying `path` when `self` is an error
    fn with_path(self, path: &str) -> LogResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: &str) -> LogResult<T> {
        self.map_err(|source| LogError::io(path, source))
    }
}
