//! Structured telemetry initialisation for the supervised node.
//!
//! Logging is the last step of the first bootstrap phase. Console output goes
//! to standard output because standard error carries the controller marker
//! protocol.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use nodeboot_config::defaults::DEFAULT_LOG_FILTER;
use nodeboot_config::{LogFormat, NodePaths};

use crate::console::{Console, ansi_enabled};

static TELEMETRY_GUARD: OnceCell<LogLocation> = OnceCell::new();
static ERROR_LISTENER: OnceCell<ErrorListener> = OnceCell::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where the node writes its log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLocation(PathBuf);

impl LogLocation {
    /// Wraps a log file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The logging subsystem reported errors while it was being configured.
    #[error("logging configuration reported errors: {}", .0.join("; "))]
    ListenerErrors(Vec<String>),
    /// Failed to build the filter from validated directives.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// The log directory could not be created.
    #[error("failed to create log directory '{}': {source}", path.display())]
    LogDirectory {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The log file could not be opened.
    #[error("failed to open log file '{}': {source}", path.display())]
    LogFile {
        /// File path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the logging subsystem on behalf of the bootstrap sequence.
pub trait LoggingConfigurator: Send + Sync {
    /// Starts collecting logging-internal errors. Called before the startup
    /// record is read.
    fn register_error_listener(&self);

    /// Configures logging for the node and returns the log file location.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] when configuration fails.
    fn configure(
        &self,
        paths: &NodePaths,
        console: Option<&Console>,
        console_output: bool,
    ) -> Result<LogLocation, TelemetryError>;
}

/// Collects errors raised inside the logging subsystem.
#[derive(Debug, Default)]
pub struct ErrorListener {
    errors: Mutex<Vec<String>>,
}

impl ErrorListener {
    /// Records an error.
    pub fn report(&self, message: String) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Takes every recorded error.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Validates filter directives one at a time.
///
/// Invalid directives are reported to the listener and skipped; the valid
/// remainder is returned, falling back to the default filter when nothing
/// survives.
pub fn validated_filter(expression: &str, listener: &ErrorListener) -> String {
    let valid: Vec<&str> = expression
        .split(',')
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .filter(|directive| match directive.parse::<Directive>() {
            Ok(_) => true,
            Err(error) => {
                listener.report(format!("invalid log directive [{directive}]: {error}"));
                false
            }
        })
        .collect();
    if valid.is_empty() {
        DEFAULT_LOG_FILTER.to_owned()
    } else {
        valid.join(",")
    }
}

/// Installs the global `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryConfigurator;

impl LoggingConfigurator for TelemetryConfigurator {
    fn register_error_listener(&self) {
        ERROR_LISTENER.get_or_init(ErrorListener::default);
    }

    /// Repeated calls are idempotent: the first invocation installs the
    /// global subscriber and later calls return the location it recorded.
    fn configure(
        &self,
        paths: &NodePaths,
        console: Option<&Console>,
        console_output: bool,
    ) -> Result<LogLocation, TelemetryError> {
        TELEMETRY_GUARD
            .get_or_try_init(|| install_subscriber(paths, console, console_output))
            .cloned()
    }
}

fn install_subscriber(
    paths: &NodePaths,
    console: Option<&Console>,
    console_output: bool,
) -> Result<LogLocation, TelemetryError> {
    let listener = ERROR_LISTENER.get_or_init(ErrorListener::default);
    let settings = paths.log();
    let directives = validated_filter(&settings.filter, listener);
    let errors = listener.drain();
    if !errors.is_empty() {
        return Err(TelemetryError::ListenerErrors(errors));
    }
    let filter =
        EnvFilter::try_new(&directives).map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let log_file = paths.log_file();
    let file = open_log_file(paths.logs(), &log_file)?;

    let mut layers: Vec<BoxedLayer> = vec![file_layer(file, settings.format)];
    if console_output {
        let ansi = ansi_enabled(console, settings.console);
        layers.push(
            fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(io::stdout)
                .with_ansi(ansi)
                .with_timer(UtcTime::rfc_3339())
                .boxed(),
        );
    }

    let subscriber = tracing_subscriber::registry().with(layers).with(filter);
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    Ok(LogLocation::new(log_file))
}

fn file_layer(file: File, format: LogFormat) -> BoxedLayer {
    let builder = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_timer(UtcTime::rfc_3339());
    match format {
        LogFormat::Json => builder.json().flatten_event(true).boxed(),
        LogFormat::Compact => builder.compact().boxed(),
    }
}

fn open_log_file(directory: &Path, path: &Path) -> Result<File, TelemetryError> {
    fs::create_dir_all(directory).map_err(|source| TelemetryError::LogDirectory {
        path: directory.to_path_buf(),
        source,
    })?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| TelemetryError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}
