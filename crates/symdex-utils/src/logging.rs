//! # Logging Utilities
//!
//! Structured logging for symdex on top of `tracing`.
//!
//! Console output goes to stderr so it never mixes with command output on
//! stdout. An optional log file receives the same events without ANSI colors.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `debug`, `symdex_core=trace`)
//! - `SYMDEX_LOG_FORMAT`: `pretty` (default) or `json`
//! - `SYMDEX_LOG_FILE`: log file path; a directory gets a dated
//!   `YYYY-MM-DD-symdex.log` inside it
//!
//! An explicit level (for example from a `--log-level` flag) takes precedence
//! over `RUST_LOG`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use symdex_utils::{init_logging_with, LogLevel, LogSettings};
//!
//! let settings = LogSettings::from_env().with_level(Some(LogLevel::Debug));
//! let _guard = init_logging_with(settings).expect("Failed to initialize logging");
//! tracing::info!("symbols loaded");
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_ENV: &str = "SYMDEX_LOG_FORMAT";
const FILE_ENV: &str = "SYMDEX_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings
{
    /// Overrides `RUST_LOG` when set.
    pub level: Option<LogLevel>,
    pub format: LogFormat,
    /// File or directory to log into, in addition to stderr.
    pub file: Option<PathBuf>,
}

impl LogSettings
{
    /// Settings from `SYMDEX_LOG_FORMAT` and `SYMDEX_LOG_FILE`.
    ///
    /// An unrecognised format falls back to pretty output with a warning on
    /// stderr, since no subscriber exists yet to report it.
    #[must_use]
    pub fn from_env() -> Self
    {
        let format = match env::var(FORMAT_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|err| {
                eprintln!("warning: {err}, using pretty output");
                LogFormat::Pretty
            }),
            Err(_) => LogFormat::Pretty,
        };
        let file = env::var_os(FILE_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Self {
            level: None,
            format,
            file,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self
    {
        if level.is_some() {
            self.level = level;
        }
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: Option<LogFormat>) -> Self
    {
        if let Some(format) = format {
            self.format = format;
        }
        self
    }

    fn filter(&self) -> EnvFilter
    {
        // Explicit level, then RUST_LOG, then INFO
        if let Some(level) = self.level {
            return EnvFilter::new(Level::from(level).to_string());
        }
        env::var("RUST_LOG")
            .ok()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(Level::INFO.to_string()))
    }
}

/// Keeps the file writer flushing; drop it only when the program exits.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard
{
    _worker: Option<WorkerGuard>,
    file: Option<PathBuf>,
}

impl LogGuard
{
    /// File events are written to, if any.
    pub fn file(&self) -> Option<&Path>
    {
        self.file.as_deref()
    }
}

/// Initialize logging from environment variables only.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the log
/// file cannot be created.
pub fn init_logging() -> Result<LogGuard, LoggingError>
{
    init_logging_with(LogSettings::from_env())
}

/// Initialize logging with an explicit level and format.
///
/// `SYMDEX_LOG_FILE` is still honoured.
///
/// ## Errors
///
/// See [`init_logging`].
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LogGuard, LoggingError>
{
    init_logging_with(
        LogSettings::from_env()
            .with_level(Some(level))
            .with_format(Some(format)),
    )
}

/// Initialize logging from resolved settings.
///
/// ## Errors
///
/// See [`init_logging`].
pub fn init_logging_with(settings: LogSettings) -> Result<LogGuard, LoggingError>
{
    let mut layers: Vec<BoxedLayer> = vec![
        format_layer(settings.format, io::stderr, true)
            .with_filter(settings.filter())
            .boxed(),
    ];

    let mut guard = LogGuard {
        _worker: None,
        file: None,
    };
    if let Some(requested) = &settings.file {
        let path = resolve_log_file(requested)?;
        let directory = path.parent().unwrap_or(Path::new("."));
        let file_name = path.file_name().unwrap_or_default();
        let (writer, worker) = tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));

        layers.push(
            format_layer(settings.format, writer, false)
                .with_filter(settings.filter())
                .boxed(),
        );
        guard = LogGuard {
            _worker: Some(worker),
            file: Some(path),
        };
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(guard)
}

fn format_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    match format {
        LogFormat::Pretty => layer.with_ansi(ansi).boxed(),
        LogFormat::Json => layer.json().with_current_span(true).with_span_list(true).boxed(),
    }
}

/// Map a requested log location to a file path, creating directories.
///
/// Existing directories and paths ending in a separator name a directory.
fn resolve_log_file(requested: &Path) -> Result<PathBuf, LoggingError>
{
    let names_directory = requested.is_dir() || requested.as_os_str().to_string_lossy().ends_with(['/', '\\']);
    let path = if names_directory {
        requested.join(dated_file_name())
    } else {
        requested.to_path_buf()
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(path)
}

fn dated_file_name() -> String
{
    format!("{}-symdex.log", Utc::now().format("%Y-%m-%d"))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// A global subscriber is already installed
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// The log file or its directory could not be created
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
