//! Non-fatal diagnostics
//!
//! Conditions that should not abort a logging call (an unknown option name,
//! a misplaced error value in the context) are reported to a
//! [`DiagnosticSink`] and the call carries on.
//!
//! - [`TracingDiagnostics`]: emits each diagnostic as a `tracing` warning (default)
//! - [`CollectingDiagnostics`]: keeps diagnostics in memory for inspection
//! - [`NullDiagnostics`]: drops everything

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

use crate::core::{LogError, LogResult};

/// Kind of advisory condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DiagnosticKind {
    /// An option name the handler does not recognize
    UnknownOption,
    /// A context entry that was dropped before dispatch
    InvalidContext,
}

impl DiagnosticKind {
    /// Stable identifier
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownOption => "unknown_option",
            Self::InvalidContext => "invalid_context",
        }
    }
}

/// A single advisory condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// What happened
    pub kind: DiagnosticKind,
    /// Human readable description
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Diagnostic for an option name `owner` does not define
    pub fn unknown_option(owner: &str, name: &str) -> Self {
        Self::new(
            DiagnosticKind::UnknownOption,
            format!("Undefined option in {owner}: {name}"),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receiver of diagnostics
///
/// Implementations should be fast; they run inline with the logging call.
pub trait DiagnosticSink: Send + Sync {
    /// Called once per diagnostic
    fn report(&self, diagnostic: &Diagnostic);
}

/// Shared handle to a sink
pub type SharedDiagnostics = Arc<dyn DiagnosticSink>;

/// Sink that forwards diagnostics to `tracing` at WARN level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, diagnostic: &Diagnostic) {
        tracing::warn!(kind = diagnostic.kind.as_str(), "{}", diagnostic.message);
    }
}

/// Sink that discards diagnostics
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl DiagnosticSink for NullDiagnostics {
    fn report(&self, _diagnostic: &Diagnostic) {}
}

/// Sink that records diagnostics in memory
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    events: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    #[must_use]
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.lock().clone()
    }

    /// Remove and return everything reported so far
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Most recent diagnostic
    #[must_use]
    pub fn last(&self) -> Option<Diagnostic> {
        self.events.lock().last().cloned()
    }

    /// Number of diagnostics reported
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl DiagnosticSink for CollectingDiagnostics {
    fn report(&self, diagnostic: &Diagnostic) {
        self.events.lock().push(diagnostic.clone());
    }
}

/// Default sink used when none is configured
#[must_use]
pub fn default_sink() -> SharedDiagnostics {
    Arc::new(TracingDiagnostics)
}

/// Install a `tracing` subscriber that prints this crate's diagnostics to stderr
///
/// `filter` uses `EnvFilter` syntax, e.g. `"beacon_log=warn"`.
///
/// # Errors
///
/// Returns error if:
/// - `filter` cannot be parsed
/// - a global subscriber is already installed
pub fn init_tracing(filter: &str) -> LogResult<()> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| LogError::Config(format!("invalid filter '{filter}': {e}")))?;
    tracing_fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| LogError::Config(format!("failed to install subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_records_in_order() {
        let sink = CollectingDiagnostics::new();
        sink.report(&Diagnostic::unknown_option("StreamHandler", "ook"));
        sink.report(&Diagnostic::new(DiagnosticKind::InvalidContext, "dropped"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.events()[0].message, "Undefined option in StreamHandler: ook");
        assert_eq!(sink.last().unwrap().kind, DiagnosticKind::InvalidContext);

        let taken = sink.take();
        assert_eq!(taken.len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn shared_sink_is_object_safe() {
        let collector = Arc::new(CollectingDiagnostics::new());
        let shared: SharedDiagnostics = collector.clone();
        shared.report(&Diagnostic::new(DiagnosticKind::UnknownOption, "x"));
        NullDiagnostics.report(&Diagnostic::new(DiagnosticKind::UnknownOption, "y"));
        TracingDiagnostics.report(&Diagnostic::new(DiagnosticKind::UnknownOption, "z"));
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn bad_filter_is_config_error() {
        let err = init_tracing("beacon_log=notalevel").unwrap_err();
        assert!(matches!(err, LogError::Config(_)));
    }
}
