//! Tracing setup.
//!
//! The TUI owns stdout/stderr while it runs, so logs go to a file when one
//! is configured and nowhere otherwise.  Headless runs log to stderr.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Where log lines should end up.
pub enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    Discard,
}

fn logs_are_json() -> bool {
    matches!(std::env::var("ELLO_LOG_FORMAT").as_deref(), Ok("json"))
}

/// Initialize tracing according to `RUST_LOG` and `ELLO_LOG_FORMAT`.
/// - Defaults to `info` if `RUST_LOG` is unset
/// - `ELLO_LOG_FORMAT=json` switches to flattened JSON lines
pub fn init_tracing(target: LogTarget<'_>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::registry().with(filter);
    let json = logs_are_json();

    // try_init: a second call (tests, embedding) keeps the first subscriber.
    match target {
        LogTarget::Discard => {}
        LogTarget::Stderr => {
            let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
            if json {
                let _ = builder.with(layer.json().flatten_event(true)).try_init();
            } else {
                let _ = builder.with(layer.compact()).try_init();
            }
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            if json {
                let _ = builder.with(layer.json().flatten_event(true)).try_init();
            } else {
                let _ = builder.with(layer.compact()).try_init();
            }
        }
    }
    Ok(())
}
