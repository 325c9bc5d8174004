//! Example demonstrating a handler chain
//!
//! This example shows how to:
//! 1. Send routine records to stdout with a custom template
//! 2. Route severe records to a file at the end of the chain
//! 3. Interpolate context values into messages
//! 4. Watch diagnostics through `tracing`

use beacon_log::prelude::*;
use beacon_log::{EXCEPTION_KEY, init_tracing};

#[derive(Debug, thiserror::Error)]
#[error("connection refused")]
struct ConnectionRefused;

fn main() -> LogResult<()> {
    init_tracing("beacon_log=debug")?;

    let dir = std::env::temp_dir().join("beacon-log-demo");
    let console = StreamHandler::builder(Stream::stdout())
        .levels([Level::Warning, Level::Notice, Level::Info, Level::Debug])
        .entry_format("[%level_name%] %channel%: %message%")
        .message_transform(MessageTransform::interpolate())
        .build()?;
    // a non-bubbling handler ends dispatch even for levels it skips,
    // so it goes last
    let errors = StreamHandler::builder(dir.join("errors.log"))
        .levels([Level::Emergency, Level::Alert, Level::Critical, Level::Error])
        .bubbles(false)
        .build()?;

    let mut logger = Logger::with_handlers(
        Some("demo"),
        [
            Box::new(console) as Box<dyn Handler>,
            Box::new(errors) as Box<dyn Handler>,
        ],
    )?;

    logger.info(
        "listening on {host}:{port}",
        Context::new().with("host", "127.0.0.1").with("port", 8080),
    )?;
    logger.error(
        "upstream unavailable",
        Context::new().with_exception(ConnectionRefused),
    )?;
    // dropped from the context, reported as a diagnostic
    logger.warning("retrying", Context::new().with(EXCEPTION_KEY, "not an error"))?;

    println!("errors written to {}", dir.join("errors.log").display());
    Ok(())
}
