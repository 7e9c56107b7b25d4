//! Command-line and environment configuration.
//!
//! Every flag can also be set through an `ELLO_*` variable, so the TUI can
//! be pointed at a different backend without editing shell aliases.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::source::StreamKind;

#[derive(Debug, Parser)]
#[command(name = "ello-feed", version, about = "Load an Ello stream into the terminal")]
pub struct Config {
    /// API root; stream paths and relative post-stream locators resolve against it
    #[arg(long, env = "ELLO_API_BASE", default_value = "http://localhost:8080/api/v2/")]
    pub api_base: String,

    /// Which stream to load
    #[arg(long, env = "ELLO_STREAM", value_enum, default_value_t = StreamKind::Editorials)]
    pub stream: StreamKind,

    /// Per-request timeout, in seconds
    #[arg(long, env = "ELLO_TIMEOUT_SECS", default_value_t = 15)]
    pub timeout_secs: u64,

    /// Reload the stream every N seconds (TUI only)
    #[arg(long, env = "ELLO_REFRESH_SECS")]
    pub refresh_secs: Option<u64>,

    /// Write logs here; the TUI discards them otherwise
    #[arg(long, env = "ELLO_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Load once and print the batch as JSON instead of starting the TUI
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `None` when auto-refresh is off (unset or zero).
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }
}
