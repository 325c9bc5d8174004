//! Entry formatting
//!
//! Timestamps use the `time` crate's format description syntax. Entries are
//! either rendered from a `%placeholder%` template or produced by an
//! [`EntryTransform`] callable.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use time::OffsetDateTime;
use time::format_description::{self, OwnedFormatItem};

use crate::context::Context;
use crate::core::{LogError, LogResult};
use crate::handler::Record;
use crate::level::Level;

/// Default timestamp format, e.g. `Oct 16 09:05:03`
pub const DEFAULT_TIME_FORMAT: &str = "[month repr:short] [day] [hour]:[minute]:[second]";

/// Default entry template
pub const DEFAULT_ENTRY_FORMAT: &str = "%time%  %channel% %level_name%  %message%";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([A-Za-z0-9_]+)%").expect("placeholder pattern is valid"));

static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_.]+)\}").expect("interpolation pattern is valid"));

/// A parsed timestamp format, keeping its source text
#[derive(Clone)]
pub struct TimeFormat {
    source: String,
    items: OwnedFormatItem,
}

impl TimeFormat {
    /// Parse a format description
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidArgument`] when `source` is not a valid description
    pub fn parse(source: &str) -> LogResult<Self> {
        let items = format_description::parse_owned::<2>(source).map_err(|e| {
            LogError::InvalidArgument(format!("invalid time format '{source}': {e}"))
        })?;
        Ok(Self {
            source: source.to_string(),
            items,
        })
    }

    /// The format description text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Format `at` with this description
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidArgument`] when the description asks for a
    /// component the timestamp cannot provide
    pub fn format(&self, at: OffsetDateTime) -> LogResult<String> {
        at.format(&self.items)
            .map_err(|e| LogError::InvalidArgument(format!("cannot format time: {e}")))
    }

    /// Format the current local time, falling back to UTC when the local
    /// offset cannot be determined
    ///
    /// # Errors
    ///
    /// See [`TimeFormat::format`]
    pub fn now(&self) -> LogResult<String> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        self.format(now)
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self::parse(DEFAULT_TIME_FORMAT).expect("default time format is valid")
    }
}

impl fmt::Debug for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TimeFormat").field(&self.source).finish()
    }
}

type MessageFn = dyn Fn(&str, &Context) -> String + Send + Sync;

/// Rewrites a message using its context before formatting
#[derive(Clone)]
pub struct MessageTransform(Arc<MessageFn>);

impl MessageTransform {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &Context) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Transform replacing `{key}` placeholders from the context
    #[must_use]
    pub fn interpolate() -> Self {
        Self::new(interpolate)
    }

    /// Apply the transform
    #[must_use]
    pub fn apply(&self, message: &str, context: &Context) -> String {
        (self.0)(message, context)
    }
}

impl fmt::Debug for MessageTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MessageTransform(..)")
    }
}

type EntryFn = dyn Fn(&str, Level, &str, &str, &str, &Context) -> String + Send + Sync;

/// Produces a whole entry line from its parts
///
/// The closure receives `(time, level, level_name, channel, message, context)`,
/// where `level_name` is the capitalized variant name (`"Error"`).
#[derive(Clone)]
pub struct EntryTransform(Arc<EntryFn>);

impl EntryTransform {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, Level, &str, &str, &str, &Context) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Apply the transform to a record
    #[must_use]
    pub fn apply(&self, record: &Record<'_>) -> String {
        (self.0)(
            record.time,
            record.level,
            record.level.title(),
            record.channel,
            record.message,
            record.context,
        )
    }
}

impl fmt::Debug for EntryTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EntryTransform(..)")
    }
}

/// How a stream handler turns a record into a line
#[derive(Debug, Clone)]
pub enum EntryFormat {
    /// `%placeholder%` template
    Template(String),
    /// Callable producing the line
    Transform(EntryTransform),
}

impl EntryFormat {
    /// Render `record` without the trailing line break
    #[must_use]
    pub fn render(&self, record: &Record<'_>) -> String {
        match self {
            Self::Template(template) => render_template(template, record),
            Self::Transform(transform) => transform.apply(record),
        }
    }

    /// Render `record` as a complete line
    #[must_use]
    pub fn render_line(&self, record: &Record<'_>) -> String {
        finish_line(self.render(record))
    }
}

impl Default for EntryFormat {
    fn default() -> Self {
        Self::Template(DEFAULT_ENTRY_FORMAT.to_string())
    }
}

/// Substitute `%placeholder%` tokens
///
/// Known placeholders are `time`, `datetime`, `channel`, `level`,
/// `level_name` and `message`. Anything else renders as an empty string. An
/// empty template renders [`DEFAULT_ENTRY_FORMAT`].
pub fn render_template(template: &str, record: &Record<'_>) -> String {
    let template = if template.is_empty() {
        DEFAULT_ENTRY_FORMAT
    } else {
        template
    };

    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "time" | "datetime" => record.time.to_string(),
            "channel" => record.channel.to_string(),
            "level" => record.level.code().to_string(),
            "level_name" => record.level.label().to_string(),
            "message" => record.message.to_string(),
            _ => String::new(),
        })
        .into_owned()
}

/// Append the line terminator
///
/// An entry spanning several lines gets one extra blank line after it.
#[must_use]
pub fn finish_line(mut entry: String) -> String {
    if entry.contains('\n') {
        entry.push('\n');
    }
    entry.push('\n');
    entry
}

/// Replace `{key}` placeholders in `message` with context values
///
/// Placeholders without a matching key are left untouched.
pub fn interpolate(message: &str, context: &Context) -> String {
    if context.is_empty() || !message.contains('{') {
        return message.to_string();
    }

    INTERPOLATION
        .replace_all(message, |caps: &Captures<'_>| match context.get(&caps[1]) {
            Some(value) => value.to_display_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
