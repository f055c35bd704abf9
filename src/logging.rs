//! Structured logger configuration
//!
//! Builds a `tracing` subscriber from a small configuration value. JSON
//! output is flattened so every event carries `timestamp`, `level`,
//! `target` and its fields at the top level.
//!
//! Nothing in this crate logs plaintext, keys or nonces; callers logging a
//! [`SealError`](crate::error::SealError) should log its message and code.

use crate::error::{ErrorCode, ErrorKind, Result, SealError};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Key under which JSON events carry their timestamp.
pub const TIMESTAMP_KEY: &str = "timestamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    /// Appends to the file, creating it if needed. The parent directory
    /// must already exist.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    level: String,
    format: LogFormat,
    output: LogOutput,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            output: LogOutput::Stderr,
        }
    }

    /// Sets the filter directive, e.g. `"debug"` or `"sealtoken=trace,warn"`.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn output(&self) -> &LogOutput {
        &self.output
    }

    /// Builds the logger without installing it anywhere.
    pub fn build(&self) -> Result<Logger> {
        let filter = EnvFilter::try_new(&self.level).map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::Logging,
                format!("invalid log level directive {:?}", self.level),
                e,
            )
        })?;

        let writer = match &self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
        };

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer);
        let dispatch = match self.format {
            LogFormat::Json => Dispatch::new(
                builder
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .finish(),
            ),
            LogFormat::Pretty => Dispatch::new(builder.pretty().finish()),
        };

        Ok(Logger { dispatch })
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::Logging,
                format!("failed to open log file {}", path.display()),
                e,
            )
        })
}

/// A built subscriber, ready to be scoped or installed globally.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// Runs `f` with this logger as the current thread's default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Installs this logger as the process-wide default.
    ///
    /// Fails if a global default has already been set.
    pub fn install(self) -> Result<()> {
        tracing::dispatcher::set_global_default(self.dispatch).map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::Logging,
                "failed to install logger",
                e,
            )
        })
    }
}
