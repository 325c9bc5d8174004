//! Stream handler
//!
//! Writes entries to a caller-supplied writer, a file, or a standard stream.
//!
//! # Destinations
//!
//! - [`Stream::Handle`]: a [`SharedStream`] owned by the caller. Entries are
//!   written and flushed directly; dropping the handler never closes it.
//! - [`Stream::Uri`]: a path or `scheme://` URI, resolved to an absolute
//!   path at construction. The file is opened lazily on the first write
//!   (creating missing parent directories), kept open for later writes and
//!   closed when the handler is dropped. [`STDOUT_URI`] and [`STDERR_URI`]
//!   name the process standard streams.

use std::any::Any;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use regex::Regex;

use super::{Handler, HandlerCore, OptionValue, Record};
use crate::context::value_type_name;
use crate::core::{IoResultExt, LogError, LogResult};
use crate::diagnostics::SharedDiagnostics;
use crate::format::{EntryFormat, EntryTransform, MessageTransform, TimeFormat};
use crate::fs::{PathService, StdPathService};
use crate::level::{Level, LevelSet};
use crate::memory;

/// Process standard output
pub const STDOUT_URI: &str = "stdio://stdout";

/// Process standard error
pub const STDERR_URI: &str = "stdio://stderr";

static URI_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<scheme>[^:\s/]+):)?(?P<slashes>/*)").expect("uri prefix pattern is valid")
});

/// A writer shared between the caller and one or more handlers
#[derive(Clone)]
pub struct SharedStream {
    inner: Arc<Mutex<dyn Write + Send>>,
    label: &'static str,
}

impl SharedStream {
    /// Share `writer`
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
            label: "handle",
        }
    }

    /// Name used for this stream in IO errors
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Whether both values point at the same writer
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn write_entry(&self, line: &str) -> io::Result<()> {
        let mut writer = self.inner.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }
}

impl fmt::Debug for SharedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedStream").field(&self.label).finish()
    }
}

/// Growable in-memory destination
#[derive(Debug, Clone, Default)]
pub struct MemoryStream {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemoryStream {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    /// Whether nothing has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.lock().is_empty()
    }

    /// Discard the buffer
    pub fn clear(&self) {
        self.buf.lock().clear();
    }
}

impl Write for MemoryStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl From<MemoryStream> for SharedStream {
    fn from(stream: MemoryStream) -> Self {
        Self {
            label: "memory",
            ..Self::new(stream)
        }
    }
}

/// Where a stream handler writes
#[derive(Debug, Clone)]
pub enum Stream {
    /// Live writer supplied by the caller
    Handle(SharedStream),
    /// Path or URI to open on first write
    Uri(String),
}

impl Stream {
    /// Process standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::Uri(STDOUT_URI.to_string())
    }

    /// Process standard error
    #[must_use]
    pub fn stderr() -> Self {
        Self::Uri(STDERR_URI.to_string())
    }

    /// Convert a configuration value
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidArgument`] for anything but a string
    pub fn from_value(value: &serde_json::Value) -> LogResult<Self> {
        match value {
            serde_json::Value::String(uri) => Ok(Self::Uri(uri.clone())),
            other => Err(LogError::InvalidArgument(format!(
                "stream must be of type handle|string, {} given",
                value_type_name(other)
            ))),
        }
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::stdout()
    }
}

impl From<&str> for Stream {
    fn from(uri: &str) -> Self {
        Self::Uri(uri.to_string())
    }
}

impl From<String> for Stream {
    fn from(uri: String) -> Self {
        Self::Uri(uri)
    }
}

impl From<&Path> for Stream {
    fn from(path: &Path) -> Self {
        Self::Uri(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Stream {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl From<SharedStream> for Stream {
    fn from(stream: SharedStream) -> Self {
        Self::Handle(stream)
    }
}

impl From<MemoryStream> for Stream {
    fn from(stream: MemoryStream) -> Self {
        Self::Handle(stream.into())
    }
}

/// A destination this handler opened itself
enum OpenStream {
    File(BufWriter<File>),
    Stdout,
    Stderr,
}

impl OpenStream {
    fn write_entry(&mut self, line: &str) -> io::Result<()> {
        match self {
            Self::File(file) => {
                file.write_all(line.as_bytes())?;
                file.flush()
            }
            Self::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(line.as_bytes())?;
                out.flush()
            }
            Self::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(line.as_bytes())?;
                err.flush()
            }
        }
    }
}

enum Destination {
    Handle(SharedStream),
    Uri {
        uri: String,
        scheme: String,
        open: Option<OpenStream>,
    },
}

/// Resolve a raw stream designator to `(uri, scheme)`
///
/// `file` URIs and bare paths are made absolute against the current
/// directory and lose their `file:` prefix. A `file:` URI is relative when
/// it has zero or two leading slashes, a bare path when it has none.
fn resolve_uri(raw: &str, paths: &dyn PathService) -> LogResult<(String, String)> {
    let value = paths.canonicalize(raw);
    let (scheme, slashes, prefix_len) = match URI_PREFIX.captures(&value) {
        Some(caps) => (
            caps.name("scheme").map_or("", |m| m.as_str()).to_string(),
            caps.name("slashes").map_or(0, |m| m.len()),
            caps.get(0).map_or(0, |m| m.len()),
        ),
        None => (String::new(), 0, 0),
    };

    if scheme.is_empty() || scheme == "file" {
        let relative = if scheme == "file" {
            slashes == 0 || slashes == 2
        } else {
            slashes == 0
        };
        let base = if relative {
            let cwd = paths.current_dir().with_path(raw)?;
            paths
                .canonicalize(&cwd.to_string_lossy())
                .trim_end_matches('/')
                .to_string()
        } else {
            String::new()
        };
        let uri = format!("{base}/{}", &value[prefix_len..]);
        return Ok((uri, "file".to_string()));
    }

    Ok((value, scheme))
}

fn open_destination(
    uri: &str,
    scheme: &str,
    chunk_size: usize,
    paths: &dyn PathService,
) -> LogResult<OpenStream> {
    match scheme {
        "file" => {
            if let Some(parent) = Path::new(uri).parent() {
                paths.ensure_dir(parent).with_path(uri)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(uri)
                .with_path(uri)?;
            tracing::debug!(uri, chunk_size, "opened log destination");
            Ok(OpenStream::File(BufWriter::with_capacity(chunk_size, file)))
        }
        "stdio" if uri == STDOUT_URI => Ok(OpenStream::Stdout),
        "stdio" if uri == STDERR_URI => Ok(OpenStream::Stderr),
        other => Err(LogError::io(
            uri,
            io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported stream scheme '{other}'"),
            ),
        )),
    }
}

/// Handler writing formatted entries to a [`Stream`]
pub struct StreamHandler {
    core: HandlerCore,
    destination: Destination,
    chunk_size: usize,
    entry: EntryFormat,
    paths: Arc<dyn PathService>,
}

impl StreamHandler {
    /// Handler accepting every level with default options
    ///
    /// # Errors
    ///
    /// See [`StreamHandlerBuilder::build`]
    pub fn new(stream: impl Into<Stream>) -> LogResult<Self> {
        Self::builder(stream).build()
    }

    /// Handler accepting only `levels`
    ///
    /// # Errors
    ///
    /// See [`StreamHandlerBuilder::build`]
    pub fn with_levels(stream: impl Into<Stream>, levels: &[Level]) -> LogResult<Self> {
        Self::builder(stream).levels(levels.iter().copied()).build()
    }

    /// Start building a handler for `stream`
    pub fn builder(stream: impl Into<Stream>) -> StreamHandlerBuilder {
        StreamHandlerBuilder::new(stream.into())
    }

    /// The caller-supplied writer, if this handler writes to one
    #[must_use]
    pub fn handle(&self) -> Option<&SharedStream> {
        match &self.destination {
            Destination::Handle(stream) => Some(stream),
            Destination::Uri { .. } => None,
        }
    }

    /// Resolved URI, if this handler writes to a path or URI
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match &self.destination {
            Destination::Uri { uri, .. } => Some(uri),
            Destination::Handle(_) => None,
        }
    }

    /// Scheme of the resolved URI, `file` for plain paths
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        match &self.destination {
            Destination::Uri { scheme, .. } => Some(scheme),
            Destination::Handle(_) => None,
        }
    }

    /// Whether a writable stream is currently held
    #[must_use]
    pub fn is_open(&self) -> bool {
        match &self.destination {
            Destination::Handle(_) => true,
            Destination::Uri { open, .. } => open.is_some(),
        }
    }

    /// Write buffer size for files this handler opens
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Current entry format
    #[must_use]
    pub fn entry_format(&self) -> &EntryFormat {
        &self.entry
    }

    /// Replace the entry format
    pub fn set_entry_format(&mut self, entry: EntryFormat) {
        self.entry = entry;
    }

    /// Point the handler at a new destination
    ///
    /// A file opened for the previous destination is closed.
    ///
    /// # Errors
    ///
    /// [`LogError::Io`] when a relative path cannot be made absolute
    pub fn set_stream(&mut self, stream: impl Into<Stream>) -> LogResult<()> {
        self.destination = match stream.into() {
            Stream::Handle(handle) => Destination::Handle(handle),
            Stream::Uri(raw) => {
                let (uri, scheme) = resolve_uri(&raw, self.paths.as_ref())?;
                Destination::Uri {
                    uri,
                    scheme,
                    open: None,
                }
            }
        };
        Ok(())
    }
}

impl Handler for StreamHandler {
    fn name(&self) -> &'static str {
        "StreamHandler"
    }

    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }

    fn format(&self, record: &Record<'_>) -> LogResult<String> {
        Ok(self.entry.render_line(record))
    }

    fn write(&mut self, line: &str) -> LogResult<()> {
        match &mut self.destination {
            Destination::Handle(stream) => stream.write_entry(line).with_path(stream.label()),
            Destination::Uri { uri, scheme, open } => {
                let mut stream = match open.take() {
                    Some(stream) => stream,
                    None => open_destination(uri, scheme, self.chunk_size, self.paths.as_ref())?,
                };
                let result = stream.write_entry(line);
                *open = Some(stream);
                result.with_path(uri)
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn extra_option(&self, name: &str) -> Option<OptionValue> {
        match (name, &self.entry) {
            ("entry_format", EntryFormat::Template(template)) => {
                Some(OptionValue::Text(template.clone()))
            }
            ("entry_transform", EntryFormat::Transform(transform)) => {
                Some(OptionValue::EntryTransform(transform.clone()))
            }
            ("entry_format" | "entry_transform", _) => Some(OptionValue::Unset),
            _ => None,
        }
    }

    fn set_extra_option(&mut self, name: &str, value: OptionValue) -> LogResult<bool> {
        match (name, value) {
            ("entry_format", OptionValue::Text(template)) => {
                self.entry = EntryFormat::Template(template);
            }
            ("entry_format", other) => {
                return Err(LogError::Type(format!(
                    "value of entry_format option must be a string, {} given",
                    other.kind_name()
                )));
            }
            ("entry_transform", OptionValue::EntryTransform(transform)) => {
                self.entry = EntryFormat::Transform(transform);
            }
            ("entry_transform", OptionValue::Unset) => self.entry = EntryFormat::default(),
            ("entry_transform", other) => {
                return Err(LogError::Type(format!(
                    "value of entry_transform option must be callable, {} given",
                    other.kind_name()
                )));
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl fmt::Debug for StreamHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("StreamHandler");
        match &self.destination {
            Destination::Handle(stream) => s.field("handle", stream),
            Destination::Uri { uri, scheme, open } => s
                .field("uri", uri)
                .field("scheme", scheme)
                .field("open", &open.is_some()),
        };
        s.field("core", &self.core)
            .field("chunk_size", &self.chunk_size)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

/// Builder for [`StreamHandler`]
#[must_use]
pub struct StreamHandlerBuilder {
    stream: Stream,
    levels: Option<Vec<Level>>,
    raw_levels: Option<Vec<i64>>,
    bubbles: bool,
    time_format: Option<String>,
    message_transform: Option<MessageTransform>,
    entry: EntryFormat,
    memory_limit: Option<String>,
    paths: Arc<dyn PathService>,
    diagnostics: Option<SharedDiagnostics>,
}

impl StreamHandlerBuilder {
    fn new(stream: Stream) -> Self {
        Self {
            stream,
            levels: None,
            raw_levels: None,
            bubbles: true,
            time_format: None,
            message_transform: None,
            entry: EntryFormat::default(),
            memory_limit: None,
            paths: Arc::new(StdPathService),
            diagnostics: None,
        }
    }

    /// Accepted levels (default: all)
    pub fn levels(mut self, levels: impl IntoIterator<Item = Level>) -> Self {
        self.levels = Some(levels.into_iter().collect());
        self.raw_levels = None;
        self
    }

    /// Accepted levels as raw codes, validated on build
    pub fn levels_raw(mut self, codes: &[i64]) -> Self {
        self.raw_levels = Some(codes.to_vec());
        self.levels = None;
        self
    }

    /// Whether dispatch continues after this handler (default: true)
    pub fn bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    /// Timestamp format description
    pub fn time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = Some(format.into());
        self
    }

    /// Message rewrite applied before formatting
    pub fn message_transform(mut self, transform: MessageTransform) -> Self {
        self.message_transform = Some(transform);
        self
    }

    /// Entry template
    pub fn entry_format(mut self, template: impl Into<String>) -> Self {
        self.entry = EntryFormat::Template(template.into());
        self
    }

    /// Callable producing entries, replacing the template
    pub fn entry_transform(mut self, transform: EntryTransform) -> Self {
        self.entry = EntryFormat::Transform(transform);
        self
    }

    /// Memory limit in shorthand notation, used to size the write buffer
    pub fn memory_limit(mut self, limit: impl Into<String>) -> Self {
        self.memory_limit = Some(limit.into());
        self
    }

    /// Filesystem service (default: [`StdPathService`])
    pub fn path_service(mut self, paths: Arc<dyn PathService>) -> Self {
        self.paths = paths;
        self
    }

    /// Diagnostics sink (default: `tracing`)
    pub fn diagnostics(mut self, diagnostics: SharedDiagnostics) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Build the handler
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the accepted levels are empty or out of range
    /// - the time format cannot be parsed
    /// - a relative path cannot be made absolute
    pub fn build(self) -> LogResult<StreamHandler> {
        let chunk_size = memory::chunk_size(self.memory_limit.as_deref());

        let destination = match self.stream {
            Stream::Handle(handle) => Destination::Handle(handle),
            Stream::Uri(raw) => {
                let (uri, scheme) = resolve_uri(&raw, self.paths.as_ref())?;
                Destination::Uri {
                    uri,
                    scheme,
                    open: None,
                }
            }
        };

        let levels = match (self.levels, self.raw_levels) {
            (Some(levels), _) => LevelSet::new(levels)?,
            (None, Some(codes)) => LevelSet::from_codes(&codes)?,
            (None, None) => LevelSet::ALL,
        };

        let mut core = HandlerCore::new(levels);
        core.options.bubbles = self.bubbles;
        core.options.message_transform = self.message_transform;
        if let Some(format) = &self.time_format {
            core.options.time_format = TimeFormat::parse(format)?;
        }
        if let Some(diagnostics) = self.diagnostics {
            core.set_diagnostics(diagnostics);
        }

        Ok(StreamHandler {
            core,
            destination,
            chunk_size,
            entry: self.entry,
            paths: self.paths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::diagnostics::{CollectingDiagnostics, DiagnosticKind};
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use rstest::rstest;
    use serde_json::json;

    /// Path service with a fixed working directory and no side effects
    struct FixedCwd(&'static str);

    impl PathService for FixedCwd {
        fn canonicalize(&self, path: &str) -> String {
            crate::fs::canonicalize(path, None)
        }

        fn ensure_dir(&self, _dir: &Path) -> io::Result<()> {
            Ok(())
        }

        fn current_dir(&self) -> io::Result<PathBuf> {
            Ok(PathBuf::from(self.0))
        }
    }

    fn entry_regex(body: &str) -> Regex {
        Regex::new(&format!(r"^[A-Z][a-z]{{2}} \d{{2}} \d{{2}}:\d{{2}}:\d{{2}}  {body}$")).unwrap()
    }

    #[rstest]
    #[case("ook", "/work/ook", "file")]
    #[case("logs/../ook.log", "/work/ook.log", "file")]
    #[case("/var/log/ook.log", "/var/log/ook.log", "file")]
    #[case("file://ook.log", "/work/ook.log", "file")]
    #[case("file:///var/log/ook.log", "/var/log/ook.log", "file")]
    #[case("file:ook.log", "/work/ook.log", "file")]
    #[case("stdio://stdout", "stdio://stdout", "stdio")]
    #[case("s3://bucket/ook.log", "s3://bucket/ook.log", "s3")]
    fn resolves_uris(#[case] raw: &str, #[case] uri: &str, #[case] scheme: &str) {
        let h = StreamHandler::builder(raw)
            .path_service(Arc::new(FixedCwd("/work/")))
            .build()
            .unwrap();
        assert_eq!(h.uri(), Some(uri));
        assert_eq!(h.scheme(), Some(scheme));
        assert!(h.handle().is_none());
        assert!(!h.is_open());
    }

    #[test]
    fn handle_destination() {
        let memory = MemoryStream::new();
        let shared: SharedStream = memory.clone().into();
        let h = StreamHandler::new(shared.clone()).unwrap();
        assert!(h.handle().unwrap().ptr_eq(&shared));
        assert_eq!(h.uri(), None);
        assert!(h.is_open());
    }

    #[test]
    fn writes_to_memory() {
        let memory = MemoryStream::new();
        let mut h = StreamHandler::new(memory.clone()).unwrap();
        h.invoke(Level::Error, Some("ook"), "Ook!\nEek!", &Context::new())
            .unwrap();
        assert!(entry_regex(r"ook ERROR  Ook!\nEek!\n\n").is_match(&memory.contents()));
    }

    #[test]
    fn writes_to_file_uri_lazily() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("dir").join("ook.log");
        let mut h = StreamHandler::new(format!("file://{}", path.display())).unwrap();

        assert!(!path.exists());
        assert!(!h.is_open());

        h.invoke(Level::Error, Some("ook"), "Ook!\nEek!", &Context::new())
            .unwrap();
        h.invoke(Level::Info, Some("ook"), "again", &Context::new())
            .unwrap();
        assert!(h.is_open());

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(entry_regex("ook ERROR  Ook!").is_match(lines[0]));
        assert_eq!(lines[1], "Eek!");
        assert_eq!(lines[2], "");
        assert!(entry_regex("ook INFO  again").is_match(lines[3]));
    }

    #[test]
    fn dropping_handler_keeps_caller_stream() {
        let memory = MemoryStream::new();
        {
            let mut h = StreamHandler::new(memory.clone()).unwrap();
            h.invoke(Level::Debug, None, "one", &Context::new()).unwrap();
        }
        let mut again = memory.clone();
        again.write_all(b"still open").unwrap();
        assert!(memory.contents().ends_with("still open"));
    }

    #[rstest]
    #[case("%ook%", "\n")]
    #[case("%channel% %channel% %channel% %channel% %level% %level_name%", "ook ook ook ook 3 ERROR\n")]
    fn entry_formatting(#[case] template: &str, #[case] expected: &str) {
        let memory = MemoryStream::new();
        let mut h = StreamHandler::builder(memory.clone())
            .entry_format(template)
            .build()
            .unwrap();
        h.invoke(Level::Error, Some("ook"), "ook", &Context::new())
            .unwrap();
        assert_eq!(memory.contents(), expected);
    }

    #[test]
    fn empty_template_uses_default() {
        let memory = MemoryStream::new();
        let mut h = StreamHandler::builder(memory.clone())
            .entry_format("")
            .build()
            .unwrap();
        h.invoke(Level::Error, Some("ook"), "ook", &Context::new())
            .unwrap();
        assert!(entry_regex(r"ook ERROR  ook\n").is_match(&memory.contents()));
    }

    #[test]
    fn entry_transform_replaces_template() {
        let memory = MemoryStream::new();
        let mut h = StreamHandler::builder(memory.clone())
            .entry_transform(EntryTransform::new(|_, level, name, channel, message, _| {
                format!("{channel}:{}:{name}:{message}", level.code())
            }))
            .build()
            .unwrap();
        h.invoke(Level::Warning, Some("ook"), " eek ", &Context::new())
            .unwrap();
        assert_eq!(memory.contents(), "ook:4:Warning:eek\n");
    }

    #[test]
    fn entry_options_by_name() {
        let sink = Arc::new(CollectingDiagnostics::new());
        let mut h = StreamHandler::builder(MemoryStream::new())
            .diagnostics(sink.clone())
            .build()
            .unwrap();

        h.set_option("entry_format", "%message%".into()).unwrap();
        assert_eq!(h.get_option("entry_format").unwrap().as_text(), Some("%message%"));
        assert!(matches!(h.get_option("entry_transform"), Some(OptionValue::Unset)));

        let err = h.set_option("entry_transform", "nope".into()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "type error: value of entry_transform option must be callable, string given"
        );

        h.set_option("ook", "eek".into()).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].kind, DiagnosticKind::UnknownOption);
        assert_eq!(sink.events()[0].message, "Undefined option in StreamHandler: ook");
    }

    #[test]
    fn unsupported_scheme_fails_on_write() {
        let mut h = StreamHandler::new("s3://bucket/ook.log").unwrap();
        let err = h
            .invoke(Level::Error, None, "ook", &Context::new())
            .unwrap_err();
        assert!(err.is_io());
        assert_eq!(err.path(), Some("s3://bucket/ook.log"));
        assert!(!h.is_open());
    }

    #[rstest]
    #[case::stdout(Stream::stdout(), STDOUT_URI)]
    #[case::stderr(Stream::stderr(), STDERR_URI)]
    fn standard_streams_open_on_write(#[case] stream: Stream, #[case] uri: &str) {
        let mut h = StreamHandler::new(stream).unwrap();
        assert_eq!(h.uri(), Some(uri));
        assert_eq!(h.scheme(), Some("stdio"));
        assert!(!h.is_open());
        h.invoke(Level::Debug, Some("ook"), "to a standard stream", &Context::new())
            .unwrap();
        assert!(h.is_open());
        // the held stream is reused
        h.invoke(Level::Debug, Some("ook"), "again", &Context::new())
            .unwrap();
    }

    #[test]
    fn open_failure_carries_path() {
        let tmp = tempfile::tempdir().unwrap();
        // a directory cannot be opened for append
        let dir = tmp.path().join("taken");
        std::fs::create_dir(&dir).unwrap();
        let mut h = StreamHandler::new(dir.clone()).unwrap();
        let err = h
            .invoke(Level::Error, None, "ook", &Context::new())
            .unwrap_err();
        assert_eq!(err.path(), Some(dir.to_string_lossy().as_ref()));
    }

    #[test]
    fn stream_from_value() {
        assert!(matches!(Stream::from_value(&json!("ook.log")), Ok(Stream::Uri(u)) if u == "ook.log"));
        let err = Stream::from_value(&json!(42)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: stream must be of type handle|string, integer given"
        );
    }

    #[test]
    fn chunk_size_follows_memory_limit() {
        let h = StreamHandler::new(MemoryStream::new()).unwrap();
        assert_eq!(h.chunk_size(), memory::DEFAULT_CHUNK_SIZE);

        let h = StreamHandler::builder(MemoryStream::new())
            .memory_limit("64M")
            .build()
            .unwrap();
        assert_eq!(h.chunk_size(), 64 * 1024 * 1024 / 10);
    }

    #[test]
    fn invalid_levels_fail_construction() {
        assert!(matches!(
            StreamHandler::with_levels(MemoryStream::new(), &[]),
            Err(LogError::InvalidArgument(_))
        ));
        assert!(matches!(
            StreamHandler::builder(MemoryStream::new()).levels_raw(&[0, 1, 9]).build(),
            Err(LogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn set_stream_switches_destination() {
        let first = MemoryStream::new();
        let second = MemoryStream::new();
        let mut h = StreamHandler::new(first.clone()).unwrap();
        h.set_stream(second.clone()).unwrap();
        h.invoke(Level::Error, None, "ook", &Context::new()).unwrap();
        assert!(first.is_empty());
        assert!(!second.is_empty());
    }
}
