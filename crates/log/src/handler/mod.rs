//! Handlers
//!
//! A [`Handler`] receives every record a [`crate::Logger`] dispatches, drops
//! the ones whose level it does not accept, and formats and writes the rest.
//! Concrete handlers only provide [`Handler::format`] and [`Handler::write`];
//! filtering, timestamps and message transforms live in [`Handler::invoke`].
//!
//! Options are addressable by name through [`Handler::get_option`] and
//! [`Handler::set_option`]:
//!
//! | name | value |
//! |---|---|
//! | `bubbles` | [`OptionValue::Bool`] |
//! | `time_format` | [`OptionValue::Text`] |
//! | `message_transform` | [`OptionValue::MessageTransform`] or [`OptionValue::Unset`] |
//!
//! plus whatever the concrete handler adds.

pub mod stream;

use std::any::Any;

use crate::context::Context;
use crate::core::{LogError, LogResult};
use crate::diagnostics::{Diagnostic, SharedDiagnostics, default_sink};
use crate::format::{EntryTransform, MessageTransform, TimeFormat};
use crate::level::{Level, LevelSet};

pub use stream::{
    MemoryStream, STDERR_URI, STDOUT_URI, SharedStream, Stream, StreamHandler,
    StreamHandlerBuilder,
};

/// A record as seen by [`Handler::format`]
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    /// Formatted timestamp
    pub time: &'a str,
    /// Severity
    pub level: Level,
    /// Channel name, empty when the logger has none
    pub channel: &'a str,
    /// Trimmed and transformed message
    pub message: &'a str,
    /// Sanitized context
    pub context: &'a Context,
}

/// Value of a named handler option
#[derive(Debug, Clone)]
pub enum OptionValue {
    /// Flag option
    Bool(bool),
    /// Text option
    Text(String),
    /// Message transform callable
    MessageTransform(MessageTransform),
    /// Entry transform callable
    EntryTransform(EntryTransform),
    /// No value; clears optional callables
    Unset,
}

impl OptionValue {
    /// Shape name used in type errors
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Text(_) => "string",
            Self::MessageTransform(_) => "MessageTransform",
            Self::EntryTransform(_) => "EntryTransform",
            Self::Unset => "null",
        }
    }

    /// The flag, if this is a [`OptionValue::Bool`]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The text, if this is a [`OptionValue::Text`]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<MessageTransform> for OptionValue {
    fn from(value: MessageTransform) -> Self {
        Self::MessageTransform(value)
    }
}

impl From<EntryTransform> for OptionValue {
    fn from(value: EntryTransform) -> Self {
        Self::EntryTransform(value)
    }
}

/// Options shared by every handler
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    /// Whether the logger keeps dispatching after this handler
    pub bubbles: bool,
    /// Timestamp format
    pub time_format: TimeFormat,
    /// Optional message rewrite
    pub message_transform: Option<MessageTransform>,
}

impl HandlerOptions {
    /// Names of the shared options
    pub const NAMES: [&'static str; 3] = ["bubbles", "time_format", "message_transform"];

    fn get(&self, name: &str) -> Option<OptionValue> {
        match name {
            "bubbles" => Some(OptionValue::Bool(self.bubbles)),
            "time_format" => Some(OptionValue::Text(self.time_format.as_str().to_string())),
            "message_transform" => Some(
                self.message_transform
                    .clone()
                    .map_or(OptionValue::Unset, OptionValue::MessageTransform),
            ),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: OptionValue) -> LogResult<()> {
        match (name, value) {
            ("bubbles", OptionValue::Bool(b)) => self.bubbles = b,
            ("time_format", OptionValue::Text(s)) => self.time_format = TimeFormat::parse(&s)?,
            ("message_transform", OptionValue::MessageTransform(t)) => {
                self.message_transform = Some(t);
            }
            ("message_transform", OptionValue::Unset) => self.message_transform = None,
            ("message_transform", other) => {
                return Err(LogError::Type(format!(
                    "value of message_transform option must be callable, {} given",
                    other.kind_name()
                )));
            }
            (name, other) => {
                return Err(LogError::Type(format!(
                    "value of {name} option has the wrong type, {} given",
                    other.kind_name()
                )));
            }
        }
        Ok(())
    }
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            bubbles: true,
            time_format: TimeFormat::default(),
            message_transform: None,
        }
    }
}

/// State every handler carries
#[derive(Clone)]
pub struct HandlerCore {
    levels: LevelSet,
    /// Shared options
    pub options: HandlerOptions,
    diagnostics: SharedDiagnostics,
}

impl HandlerCore {
    /// Core accepting `levels` with default options
    #[must_use]
    pub fn new(levels: LevelSet) -> Self {
        Self {
            levels,
            options: HandlerOptions::default(),
            diagnostics: default_sink(),
        }
    }

    /// Accepted levels
    #[must_use]
    pub fn levels(&self) -> LevelSet {
        self.levels
    }

    /// Sink for advisory conditions
    #[must_use]
    pub fn diagnostics(&self) -> &SharedDiagnostics {
        &self.diagnostics
    }

    /// Replace the diagnostics sink
    pub fn set_diagnostics(&mut self, diagnostics: SharedDiagnostics) {
        self.diagnostics = diagnostics;
    }
}

impl Default for HandlerCore {
    fn default() -> Self {
        Self::new(LevelSet::ALL)
    }
}

impl std::fmt::Debug for HandlerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerCore")
            .field("levels", &self.levels)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A destination records are dispatched to
pub trait Handler: Send {
    /// Type name used in diagnostics, e.g. `"StreamHandler"`
    fn name(&self) -> &'static str;

    /// Shared state
    fn core(&self) -> &HandlerCore;

    /// Shared state, mutably
    fn core_mut(&mut self) -> &mut HandlerCore;

    /// Turn a record into the text to write
    ///
    /// # Errors
    ///
    /// Implementation specific
    fn format(&self, record: &Record<'_>) -> LogResult<String>;

    /// Write formatted text to the destination
    ///
    /// # Errors
    ///
    /// [`LogError::Io`] when the destination cannot be opened or written
    fn write(&mut self, line: &str) -> LogResult<()>;

    /// Downcasting support
    fn as_any(&self) -> &dyn Any;

    /// Read a handler specific option; `None` when the name is not one
    fn extra_option(&self, _name: &str) -> Option<OptionValue> {
        None
    }

    /// Set a handler specific option
    ///
    /// Returns `Ok(false)` when the name is not one.
    ///
    /// # Errors
    ///
    /// [`LogError::Type`] when the value has the wrong shape
    fn set_extra_option(&mut self, _name: &str, _value: OptionValue) -> LogResult<bool> {
        Ok(false)
    }

    /// Accepted levels
    fn levels(&self) -> LevelSet {
        self.core().levels
    }

    /// Replace the accepted levels
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidArgument`] when `levels` is empty
    fn set_levels(&mut self, levels: &[Level]) -> LogResult<()> {
        self.core_mut().levels = LevelSet::new(levels.iter().copied())?;
        Ok(())
    }

    /// Replace the accepted levels from raw codes
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidArgument`] when `codes` is empty or out of range
    fn set_levels_raw(&mut self, codes: &[i64]) -> LogResult<()> {
        self.core_mut().levels = LevelSet::from_codes(codes)?;
        Ok(())
    }

    /// Whether dispatch continues past this handler
    fn bubbles(&self) -> bool {
        self.core().options.bubbles
    }

    /// Read an option by name
    ///
    /// Unknown names are reported to the diagnostics sink and yield `None`.
    fn get_option(&self, name: &str) -> Option<OptionValue> {
        let value = self
            .core()
            .options
            .get(name)
            .or_else(|| self.extra_option(name));
        if value.is_none() {
            self.core()
                .diagnostics
                .report(&Diagnostic::unknown_option(self.name(), name));
        }
        value
    }

    /// Set an option by name
    ///
    /// Unknown names are reported to the diagnostics sink and ignored.
    ///
    /// # Errors
    ///
    /// [`LogError::Type`] when the value has the wrong shape for the option,
    /// [`LogError::InvalidArgument`] for an unparsable time format
    fn set_option(&mut self, name: &str, value: OptionValue) -> LogResult<()> {
        if HandlerOptions::NAMES.contains(&name) {
            return self.core_mut().options.set(name, value);
        }
        if !self.set_extra_option(name, value)? {
            self.core()
                .diagnostics
                .report(&Diagnostic::unknown_option(self.name(), name));
        }
        Ok(())
    }

    /// Dispatch entry point
    ///
    /// Records whose level is not accepted are dropped before any formatting
    /// happens. Otherwise the message is trimmed, passed through the message
    /// transform, formatted and written.
    ///
    /// # Errors
    ///
    /// Anything [`Handler::format`] or [`Handler::write`] returns
    fn invoke(
        &mut self,
        level: Level,
        channel: Option<&str>,
        message: &str,
        context: &Context,
    ) -> LogResult<()> {
        let core = self.core();
        if !core.levels.contains(level) {
            tracing::trace!(handler = self.name(), %level, "level not accepted");
            return Ok(());
        }

        let time = core.options.time_format.now()?;
        let message = match &core.options.message_transform {
            Some(transform) => transform.apply(message.trim(), context),
            None => message.trim().to_string(),
        };

        let record = Record {
            time: &time,
            level,
            channel: channel.unwrap_or(""),
            message: &message,
            context,
        };
        let line = self.format(&record)?;
        self.write(&line)
    }
}
