//! # Beacon Log - PSR-3 style logging facade
//!
//! A channel-named [`Logger`] sends each record to an ordered stack of
//! [`Handler`]s. Each handler filters by [`Level`], formats the record and
//! writes it; dispatch stops at the first handler that does not bubble.
//! [`StreamHandler`] writes to files, URIs, the standard streams or a
//! caller-supplied writer.
//!
//! ## Quick Start
//!
//! ```rust
//! use beacon_log::prelude::*;
//!
//! fn main() -> LogResult<()> {
//!     let out = MemoryStream::new();
//!     let handler = StreamHandler::builder(out.clone())
//!         .levels([Level::Error, Level::Warning])
//!         .entry_format("%channel% %level_name% %message%")
//!         .build()?;
//!
//!     let mut logger = Logger::with_handlers(Some("app"), [Box::new(handler) as Box<dyn Handler>])?;
//!     logger.error("disk almost full", Context::new().with("free_mb", 12))?;
//!     logger.debug("filtered out", Context::new())?;
//!
//!     assert_eq!(out.contents(), "app ERROR disk almost full\n");
//!     Ok(())
//! }
//! ```
//!
//! Advisory conditions (unknown option names, misplaced error values in a
//! context) never fail a call; they go to a [`DiagnosticSink`], `tracing`
//! warnings by default.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod context;
pub mod core;
pub mod diagnostics;
pub mod format;
pub mod fs;
pub mod handler;
pub mod level;
pub mod logger;
pub mod memory;

// Public API
pub use config::{LoggerConfig, StreamHandlerConfig};
pub use context::{Context, ContextError, ContextValue, EXCEPTION_KEY};
pub use crate::core::{IoResultExt, LogError, LogResult};
pub use diagnostics::{
    CollectingDiagnostics, Diagnostic, DiagnosticKind, DiagnosticSink, NullDiagnostics,
    SharedDiagnostics, TracingDiagnostics, init_tracing,
};
pub use format::{EntryFormat, EntryTransform, MessageTransform, TimeFormat, interpolate};
pub use fs::{PathService, StdPathService};
pub use handler::{
    Handler, HandlerCore, HandlerOptions, MemoryStream, OptionValue, Record, STDERR_URI,
    STDOUT_URI, SharedStream, Stream, StreamHandler, StreamHandlerBuilder,
};
pub use level::{Level, LevelSet, to_name};
pub use logger::Logger;

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Context, Handler, Level, LogError, LogResult, Logger, LoggerConfig, MemoryStream,
        MessageTransform, Stream, StreamHandler,
    };
}
