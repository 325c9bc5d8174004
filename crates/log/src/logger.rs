//! Channel-named logger dispatching to a stack of handlers

use std::fmt;

use crate::config::LoggerConfig;
use crate::context::{Context, EXCEPTION_KEY};
use crate::core::{LogError, LogResult};
use crate::diagnostics::{Diagnostic, DiagnosticKind, SharedDiagnostics, default_sink};
use crate::handler::{Handler, Stream, StreamHandler};
use crate::level::Level;

/// Longest channel name kept, in characters
pub const CHANNEL_MAX_CHARS: usize = 29;

/// Logger with an optional channel and a never-empty handler stack
///
/// Records go to the handlers in order. Dispatch stops after the first
/// handler whose `bubbles` option is false.
///
/// # Examples
///
/// ```
/// use beacon_log::{Context, Logger, MemoryStream, StreamHandler};
///
/// let out = MemoryStream::new();
/// let mut logger = Logger::with_handlers(
///     Some("ook"),
///     [Box::new(StreamHandler::new(out.clone())?) as Box<dyn beacon_log::Handler>],
/// )?;
/// logger.error("Ook!", Context::new())?;
/// assert!(out.contents().ends_with("ook ERROR  Ook!\n"));
/// # Ok::<(), beacon_log::LogError>(())
/// ```
pub struct Logger {
    channel: Option<String>,
    handlers: Vec<Box<dyn Handler>>,
    warn_on_invalid_context: bool,
    diagnostics: SharedDiagnostics,
}

macro_rules! level_methods {
    ($($(#[$doc:meta])* $name:ident => $level:expr;)*) => {
        $(
            $(#[$doc])*
            ///
            /// # Errors
            ///
            /// See [`Logger::log`]
            pub fn $name(&mut self, message: &str, context: Context) -> LogResult<()> {
                self.log($level, message, context)
            }
        )*
    };
}

impl Logger {
    /// Logger with the default handlers: levels 0-3 to stderr, 4-7 to stdout
    ///
    /// # Errors
    ///
    /// Only if the default handlers cannot be built
    pub fn new(channel: Option<&str>) -> LogResult<Self> {
        Self::with_handlers(channel, [])
    }

    /// Logger with the given handlers, or the defaults when there are none
    ///
    /// # Errors
    ///
    /// Only if the default handlers are needed and cannot be built
    pub fn with_handlers(
        channel: Option<&str>,
        handlers: impl IntoIterator<Item = Box<dyn Handler>>,
    ) -> LogResult<Self> {
        let mut handlers: Vec<_> = handlers.into_iter().collect();
        if handlers.is_empty() {
            handlers = default_handlers()?;
        }

        let mut logger = Self {
            channel: None,
            handlers,
            warn_on_invalid_context: true,
            diagnostics: default_sink(),
        };
        logger.set_channel(channel);
        Ok(logger)
    }

    /// Build a logger from configuration
    ///
    /// # Errors
    ///
    /// See [`LoggerConfig::build`]
    pub fn from_config(config: &LoggerConfig) -> LogResult<Self> {
        config.build()
    }

    /// Channel name
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Replace the channel, keeping at most [`CHANNEL_MAX_CHARS`] characters
    pub fn set_channel(&mut self, channel: Option<&str>) {
        self.channel = channel.map(|c| c.chars().take(CHANNEL_MAX_CHARS).collect());
    }

    /// Handlers in dispatch order
    #[must_use]
    pub fn handlers(&self) -> &[Box<dyn Handler>] {
        &self.handlers
    }

    /// Handlers in dispatch order, for reconfiguration
    pub fn handlers_mut(&mut self) -> &mut [Box<dyn Handler>] {
        &mut self.handlers
    }

    /// Append handlers
    ///
    /// # Errors
    ///
    /// [`LogError::ArgumentCount`] when `handlers` is empty
    pub fn push_handler(
        &mut self,
        handlers: impl IntoIterator<Item = Box<dyn Handler>>,
    ) -> LogResult<()> {
        let handlers = non_empty("push_handler", handlers)?;
        self.handlers.extend(handlers);
        Ok(())
    }

    /// Prepend handlers, keeping their relative order
    ///
    /// # Errors
    ///
    /// [`LogError::ArgumentCount`] when `handlers` is empty
    pub fn unshift_handler(
        &mut self,
        handlers: impl IntoIterator<Item = Box<dyn Handler>>,
    ) -> LogResult<()> {
        let handlers = non_empty("unshift_handler", handlers)?;
        self.handlers.splice(0..0, handlers);
        Ok(())
    }

    /// Replace the whole stack
    ///
    /// # Errors
    ///
    /// [`LogError::ArgumentCount`] when `handlers` is empty; the stack is
    /// left unchanged
    pub fn set_handlers(
        &mut self,
        handlers: impl IntoIterator<Item = Box<dyn Handler>>,
    ) -> LogResult<()> {
        self.handlers = non_empty("set_handlers", handlers)?;
        Ok(())
    }

    /// Remove and return the last handler
    ///
    /// # Errors
    ///
    /// [`LogError::Underflow`] when only one handler is left
    pub fn pop_handler(&mut self) -> LogResult<Box<dyn Handler>> {
        if self.handlers.len() <= 1 {
            return Err(LogError::Underflow(
                "popping the last handler would leave the logger with zero handlers".into(),
            ));
        }
        Ok(self.handlers.remove(self.handlers.len() - 1))
    }

    /// Remove and return the first handler
    ///
    /// # Errors
    ///
    /// [`LogError::Underflow`] when only one handler is left
    pub fn shift_handler(&mut self) -> LogResult<Box<dyn Handler>> {
        if self.handlers.len() <= 1 {
            return Err(LogError::Underflow(
                "shifting the last handler would leave the logger with zero handlers".into(),
            ));
        }
        Ok(self.handlers.remove(0))
    }

    /// Whether dropped context entries are reported
    #[must_use]
    pub fn warn_on_invalid_context(&self) -> bool {
        self.warn_on_invalid_context
    }

    /// Turn reporting of dropped context entries on or off
    pub fn set_warn_on_invalid_context(&mut self, warn: bool) {
        self.warn_on_invalid_context = warn;
    }

    /// Sink for context diagnostics
    #[must_use]
    pub fn diagnostics(&self) -> &SharedDiagnostics {
        &self.diagnostics
    }

    /// Replace the sink for context diagnostics
    pub fn set_diagnostics(&mut self, diagnostics: SharedDiagnostics) {
        self.diagnostics = diagnostics;
    }

    level_methods! {
        /// System is unusable
        emergency => Level::Emergency;
        /// Action must be taken immediately
        alert => Level::Alert;
        /// Critical conditions
        critical => Level::Critical;
        /// Runtime errors
        error => Level::Error;
        /// Exceptional occurrences that are not errors
        warning => Level::Warning;
        /// Normal but significant events
        notice => Level::Notice;
        /// Interesting events
        info => Level::Info;
        /// Detailed debug information
        debug => Level::Debug;
    }

    /// Dispatch a record at `level`
    ///
    /// Misplaced error values are dropped from `context` first.
    ///
    /// # Errors
    ///
    /// The first handler error; later handlers are not invoked
    pub fn log(&mut self, level: Level, message: &str, mut context: Context) -> LogResult<()> {
        self.sanitize(&mut context);

        let channel = self.channel.as_deref();
        for handler in &mut self.handlers {
            handler.invoke(level, channel, message, &context)?;
            if !handler.bubbles() {
                tracing::trace!(handler = handler.name(), %level, "dispatch stopped");
                break;
            }
        }
        Ok(())
    }

    /// Dispatch a record whose level is a raw integer code or PSR-3 name
    ///
    /// # Errors
    ///
    /// See [`Level::from_value`] and [`Logger::log`]
    pub fn log_raw(
        &mut self,
        level: &serde_json::Value,
        message: &str,
        context: Context,
    ) -> LogResult<()> {
        let level = Level::from_value(level)?;
        self.log(level, message, context)
    }

    /// Drop non-error values under [`EXCEPTION_KEY`] and error values
    /// anywhere else
    fn sanitize(&self, context: &mut Context) {
        let warn = self.warn_on_invalid_context;
        let diagnostics = &self.diagnostics;
        context.retain(|key, value| {
            let message = match (key == EXCEPTION_KEY, value.is_error()) {
                (true, false) => format!(
                    "The '{EXCEPTION_KEY}' context key can only contain error values, {} given",
                    value.type_name()
                ),
                (false, true) => format!(
                    "Values of type {} can only be contained in the '{EXCEPTION_KEY}' context key",
                    value.type_name()
                ),
                _ => return true,
            };
            if warn {
                diagnostics.report(&Diagnostic::new(DiagnosticKind::InvalidContext, message));
            }
            false
        });
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("Logger")
            .field("channel", &self.channel)
            .field("handlers", &names)
            .field("warn_on_invalid_context", &self.warn_on_invalid_context)
            .finish_non_exhaustive()
    }
}

fn default_handlers() -> LogResult<Vec<Box<dyn Handler>>> {
    let errors = StreamHandler::with_levels(
        Stream::stderr(),
        &[Level::Emergency, Level::Alert, Level::Critical, Level::Error],
    )?;
    let rest = StreamHandler::with_levels(
        Stream::stdout(),
        &[Level::Warning, Level::Notice, Level::Info, Level::Debug],
    )?;
    Ok(vec![Box::new(errors), Box::new(rest)])
}

fn non_empty(
    op: &str,
    handlers: impl IntoIterator<Item = Box<dyn Handler>>,
) -> LogResult<Vec<Box<dyn Handler>>> {
    let handlers: Vec<_> = handlers.into_iter().collect();
    if handlers.is_empty() {
        return Err(LogError::ArgumentCount(format!(
            "{op} expects at least 1 handler, 0 given"
        )));
    }
    Ok(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::format::EntryTransform;
    use crate::handler::{MemoryStream, STDERR_URI, STDOUT_URI};
    use crate::level::LevelSet;
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    fn memory_handler(out: &MemoryStream) -> Box<dyn Handler> {
        Box::new(StreamHandler::new(out.clone()).unwrap())
    }

    /// Handler writing the context keys it receives, comma separated
    fn keys_handler(out: &MemoryStream) -> Box<dyn Handler> {
        Box::new(
            StreamHandler::builder(out.clone())
                .entry_transform(EntryTransform::new(|_, _, _, _, _, ctx| {
                    ctx.iter().map(|(k, _)| k).collect::<Vec<_>>().join(",")
                }))
                .build()
                .unwrap(),
        )
    }

    fn stream_of(handler: &dyn Handler) -> &StreamHandler {
        handler.as_any().downcast_ref::<StreamHandler>().unwrap()
    }

    #[test]
    fn default_handlers_split_by_severity() {
        let logger = Logger::new(None).unwrap();
        assert_eq!(logger.channel(), None);

        let handlers = logger.handlers();
        assert_eq!(handlers.len(), 2);
        assert_eq!(stream_of(handlers[0].as_ref()).uri(), Some(STDERR_URI));
        assert_eq!(
            handlers[0].levels(),
            LevelSet::from_codes(&[0, 1, 2, 3]).unwrap()
        );
        assert_eq!(stream_of(handlers[1].as_ref()).uri(), Some(STDOUT_URI));
        assert_eq!(
            handlers[1].levels(),
            LevelSet::from_codes(&[4, 5, 6, 7]).unwrap()
        );
    }

    #[test]
    fn channel_is_truncated() {
        let mut logger = Logger::new(Some("ook")).unwrap();
        assert_eq!(logger.channel(), Some("ook"));

        let long = "a".repeat(35);
        logger.set_channel(Some(&long));
        assert_eq!(logger.channel(), Some(&long[..29]));

        logger.set_channel(None);
        assert_eq!(logger.channel(), None);
    }

    #[test]
    fn last_handler_cannot_be_removed() {
        let out = MemoryStream::new();
        let mut logger = Logger::with_handlers(None, [memory_handler(&out)]).unwrap();

        assert!(matches!(logger.pop_handler(), Err(LogError::Underflow(_))));
        assert!(matches!(logger.shift_handler(), Err(LogError::Underflow(_))));
        assert_eq!(logger.handlers().len(), 1);
    }

    #[test]
    fn empty_handler_lists_are_rejected() {
        let out = MemoryStream::new();
        let mut logger = Logger::with_handlers(None, [memory_handler(&out)]).unwrap();

        let err = logger.push_handler([]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument count: push_handler expects at least 1 handler, 0 given"
        );
        assert!(matches!(logger.unshift_handler([]), Err(LogError::ArgumentCount(_))));
        assert!(matches!(logger.set_handlers([]), Err(LogError::ArgumentCount(_))));
        assert_eq!(logger.handlers().len(), 1);
    }

    #[test]
    fn stack_operations_keep_order() {
        let (a, b, c) = (MemoryStream::new(), MemoryStream::new(), MemoryStream::new());
        let mut logger = Logger::with_handlers(None, [memory_handler(&b)]).unwrap();
        logger.push_handler([memory_handler(&c)]).unwrap();
        logger.unshift_handler([memory_handler(&a)]).unwrap();
        assert_eq!(logger.handlers().len(), 3);

        let mut first = logger.shift_handler().unwrap();
        let mut last = logger.pop_handler().unwrap();
        assert_eq!(logger.handlers().len(), 1);

        logger.info("only b", Context::new()).unwrap();
        assert!(a.is_empty());
        assert!(c.is_empty());
        assert!(b.contents().contains("only b"));

        first.invoke(Level::Info, None, "to a", &Context::new()).unwrap();
        last.invoke(Level::Info, None, "to c", &Context::new()).unwrap();
        assert!(a.contents().contains("to a"));
        assert!(c.contents().contains("to c"));
    }

    #[test]
    fn logs_error_line() {
        let out = MemoryStream::new();
        let mut logger = Logger::with_handlers(Some("ook"), [memory_handler(&out)]).unwrap();
        logger.error("Ook!", Context::new()).unwrap();

        let line = Regex::new(r"^[A-Z][a-z]{2} \d{2} \d{2}:\d{2}:\d{2}  ook ERROR  Ook!\n$").unwrap();
        assert!(line.is_match(&out.contents()), "{:?}", out.contents());
    }

    #[test]
    fn non_bubbling_handler_stops_dispatch() {
        let (first, second) = (MemoryStream::new(), MemoryStream::new());
        let stopper = StreamHandler::builder(first.clone())
            .bubbles(false)
            .build()
            .unwrap();
        let mut logger = Logger::with_handlers(
            Some("ook"),
            [Box::new(stopper) as Box<dyn Handler>, memory_handler(&second)],
        )
        .unwrap();

        logger.error("Ook!", Context::new()).unwrap();
        assert!(!first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn filtered_handler_still_bubbles() {
        let (first, second) = (MemoryStream::new(), MemoryStream::new());
        let picky = StreamHandler::builder(first.clone())
            .levels([Level::Emergency])
            .build()
            .unwrap();
        let mut logger = Logger::with_handlers(
            None,
            [Box::new(picky) as Box<dyn Handler>, memory_handler(&second)],
        )
        .unwrap();

        logger.debug("eek", Context::new()).unwrap();
        assert!(first.is_empty());
        assert!(second.contents().contains("DEBUG  eek"));
    }

    #[test]
    fn misplaced_context_values_are_dropped_and_reported() {
        let out = MemoryStream::new();
        let sink = Arc::new(CollectingDiagnostics::new());
        let mut logger = Logger::with_handlers(None, [keys_handler(&out)]).unwrap();
        logger.set_diagnostics(sink.clone());

        let ctx = Context::new()
            .with("exception", "not-a-throwable")
            .with("user", "ook")
            .with_error("cause", DiskFull);
        logger.error("Ook!", ctx).unwrap();

        assert_eq!(out.contents(), "user\n");
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == DiagnosticKind::InvalidContext));
        assert_eq!(
            events[0].message,
            "The 'exception' context key can only contain error values, string given"
        );
        assert!(events[1].message.starts_with("Values of type "));
        assert!(events[1].message.ends_with("DiskFull can only be contained in the 'exception' context key"));
    }

    #[test]
    fn valid_exception_is_kept() {
        let out = MemoryStream::new();
        let sink = Arc::new(CollectingDiagnostics::new());
        let mut logger = Logger::with_handlers(None, [keys_handler(&out)]).unwrap();
        logger.set_diagnostics(sink.clone());

        logger
            .critical("Ook!", Context::new().with_exception(DiskFull))
            .unwrap();
        assert_eq!(out.contents(), "exception\n");
        assert!(sink.is_empty());
    }

    #[test]
    fn context_warnings_can_be_silenced() {
        let out = MemoryStream::new();
        let sink = Arc::new(CollectingDiagnostics::new());
        let mut logger = Logger::with_handlers(None, [keys_handler(&out)]).unwrap();
        logger.set_diagnostics(sink.clone());
        logger.set_warn_on_invalid_context(false);

        logger
            .error("Ook!", Context::new().with("exception", 42))
            .unwrap();
        assert_eq!(out.contents(), "\n");
        assert!(sink.is_empty());
    }

    #[test]
    fn raw_levels() {
        let out = MemoryStream::new();
        let mut logger = Logger::with_handlers(Some("ook"), [memory_handler(&out)]).unwrap();

        logger.log_raw(&json!("warning"), "by name", Context::new()).unwrap();
        logger.log_raw(&json!(2), "by code", Context::new()).unwrap();
        let contents = out.contents();
        assert!(contents.contains("ook WARNING  by name"));
        assert!(contents.contains("ook CRITICAL  by code"));

        assert!(matches!(
            logger.log_raw(&json!(42), "x", Context::new()),
            Err(LogError::InvalidArgument(_))
        ));
        assert!(matches!(
            logger.log_raw(&json!("loud"), "x", Context::new()),
            Err(LogError::InvalidLevelName(_))
        ));
        let err = logger.log_raw(&json!([1]), "x", Context::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: level must be of type int|Level|string, array given"
        );
    }

    #[test]
    fn handler_error_aborts_dispatch() {
        let out = MemoryStream::new();
        let broken = StreamHandler::new("s3://bucket/ook.log").unwrap();
        let mut logger = Logger::with_handlers(
            None,
            [Box::new(broken) as Box<dyn Handler>, memory_handler(&out)],
        )
        .unwrap();

        let err = logger.error("Ook!", Context::new()).unwrap_err();
        assert!(err.is_io());
        assert!(out.is_empty());
    }
}
