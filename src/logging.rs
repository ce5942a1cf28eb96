//! Diagnostic output configuration
//!
//! Pipelines only emit `tracing` events; where they go is decided by a
//! [`LogConfig`] value. Binaries install the resulting subscriber once as the
//! process default, tests scope it with `tracing::subscriber::with_default`.

use crate::{Error, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Where and how verbosely to log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    level: Level,
    file: Option<PathBuf>,
    console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file: None,
            console: true,
        }
    }
}

impl LogConfig {
    /// Console logging at INFO
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a `-v` count onto a level: 0 → INFO, 1 → DEBUG, 2+ → TRACE
    #[must_use]
    pub const fn level_from_verbosity(verbose: u8) -> Level {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Minimum severity
    #[must_use]
    pub const fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Also append plain-text log lines to `path`
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Enable or disable stdout output
    #[must_use]
    pub const fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Minimum severity
    #[must_use]
    pub const fn level(&self) -> Level {
        self.level
    }

    /// Build the subscriber; `RUST_LOG` overrides the configured level
    ///
    /// # Errors
    /// Returns error if the log file cannot be opened
    pub fn subscriber(&self) -> Result<impl tracing::Subscriber + Send + Sync> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()));

        let console = self
            .console
            .then(|| fmt::layer().with_target(false).with_writer(std::io::stdout));

        let file = match &self.file {
            Some(path) => {
                let handle = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| {
                        Error::StorageError(format!("Failed to open log file {}: {e}", path.display()))
                    })?;
                Some(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(handle)),
                )
            }
            None => None,
        };

        Ok(Registry::default().with(filter).with(console).with(file))
    }

    /// Install as the process-wide default subscriber
    ///
    /// # Errors
    /// Returns error if the log file cannot be opened or a default is
    /// already installed
    pub fn init(&self) -> Result<()> {
        tracing::subscriber::set_global_default(self.subscriber()?)
            .map_err(|e| Error::InvalidInput(format!("logging already initialised: {e}")))
    }
}
