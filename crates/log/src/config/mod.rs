//! Configuration types
//!
//! - [`LoggerConfig`]: channel, context warnings, memory limit and handlers
//! - [`StreamHandlerConfig`]: one stream handler
//!
//! Presets (`split_std`, `single`, `from_env`) live in `presets`.

mod presets;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use presets::{ENV_CHANNEL, ENV_MEMORY_LIMIT, ENV_STREAM, ENV_WARN_CONTEXT};

use crate::core::{LogError, LogResult};
use crate::diagnostics::{Diagnostic, SharedDiagnostics, default_sink};
use crate::handler::{Handler, STDOUT_URI, Stream, StreamHandler};
use crate::level::Level;
use crate::logger::Logger;

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Channel name
    pub channel: Option<String>,

    /// Report context entries dropped before dispatch
    pub warn_on_invalid_context: bool,

    /// Memory limit in shorthand notation (`"128M"`), sizes file write buffers
    pub memory_limit: Option<String>,

    /// Handlers in dispatch order; empty means the logger defaults
    pub handlers: Vec<StreamHandlerConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            channel: None,
            warn_on_invalid_context: true,
            memory_limit: None,
            handlers: Vec::new(),
        }
    }
}

impl LoggerConfig {
    /// Parse a JSON document
    ///
    /// # Errors
    ///
    /// [`LogError::Config`] when the document does not describe a config
    pub fn from_json(json: &str) -> LogResult<Self> {
        serde_json::from_str(json).map_err(|e| LogError::Config(e.to_string()))
    }

    /// Build a logger reporting diagnostics to `tracing`
    ///
    /// # Errors
    ///
    /// See [`LoggerConfig::build_with`]
    pub fn build(&self) -> LogResult<Logger> {
        self.build_with(default_sink())
    }

    /// Build a logger reporting diagnostics to `diagnostics`
    ///
    /// # Errors
    ///
    /// The first handler that fails to build
    pub fn build_with(&self, diagnostics: SharedDiagnostics) -> LogResult<Logger> {
        // the default split still honours the sink and memory limit
        let defaults;
        let specs = if self.handlers.is_empty() {
            defaults = Self::split_std().handlers;
            &defaults
        } else {
            &self.handlers
        };
        let handlers = specs
            .iter()
            .map(|h| {
                h.build(self.memory_limit.as_deref(), &diagnostics)
                    .map(|h| Box::new(h) as Box<dyn Handler>)
            })
            .collect::<LogResult<Vec<_>>>()?;

        let mut logger = Logger::with_handlers(self.channel.as_deref(), handlers)?;
        logger.set_warn_on_invalid_context(self.warn_on_invalid_context);
        logger.set_diagnostics(diagnostics);
        Ok(logger)
    }
}

/// One stream handler
///
/// Keys other than the listed fields are collected in `unknown` and reported
/// as unknown options when the handler is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamHandlerConfig {
    /// Destination path or URI
    pub stream: serde_json::Value,

    /// Accepted levels by name
    pub levels: Vec<Level>,

    /// Continue dispatch after this handler
    pub bubbles: bool,

    /// Timestamp format description
    pub time_format: Option<String>,

    /// Entry template
    pub entry_format: Option<String>,

    /// Unrecognized keys
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

impl Default for StreamHandlerConfig {
    fn default() -> Self {
        Self::new(STDOUT_URI)
    }
}

impl StreamHandlerConfig {
    /// Catch-all handler for `stream`
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: serde_json::Value::String(stream.into()),
            levels: Level::ALL.to_vec(),
            bubbles: true,
            time_format: None,
            entry_format: None,
            unknown: BTreeMap::new(),
        }
    }

    /// Restrict to `levels`
    #[must_use]
    pub fn with_levels(mut self, levels: &[Level]) -> Self {
        self.levels = levels.to_vec();
        self
    }

    /// Build the handler
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `stream` is not a string
    /// - `levels` is empty
    /// - the time format cannot be parsed
    pub fn build(
        &self,
        memory_limit: Option<&str>,
        diagnostics: &SharedDiagnostics,
    ) -> LogResult<StreamHandler> {
        let mut builder = StreamHandler::builder(Stream::from_value(&self.stream)?)
            .levels(self.levels.iter().copied())
            .bubbles(self.bubbles)
            .diagnostics(diagnostics.clone());
        if let Some(format) = &self.time_format {
            builder = builder.time_format(format.clone());
        }
        if let Some(template) = &self.entry_format {
            builder = builder.entry_format(template.clone());
        }
        if let Some(limit) = memory_limit {
            builder = builder.memory_limit(limit);
        }
        let handler = builder.build()?;

        for name in self.unknown.keys() {
            diagnostics.report(&Diagnostic::unknown_option(handler.name(), name));
        }
        Ok(handler)
    }
}
