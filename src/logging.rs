/// Structured logging for the bloom monitoring pipeline.
///
/// Provides context-rich logging with feed/site identifiers, timestamps,
/// and severity levels. Supports console output and an optional log file.
///
/// Warnings are additionally captured in a session buffer regardless of
/// logger configuration: the presentation layer renders non-fatal problems
/// (a missing feed file, for example) as an inline banner, and needs them
/// as data rather than as stderr lines.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stage Tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Primary,
    Community,
    Registry,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Primary => write!(f, "PRIMARY"),
            DataSource::Community => write!(f, "COMMUNITY"),
            DataSource::Registry => write!(f, "REGISTRY"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

/// Warnings accumulated over the session, in emission order. Populated even
/// when the logger has not been initialized, since the UI banner depends on
/// these and tests drive the normalizers without console output.
static SESSION_WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>) {
        let logger = Logger { min_level, log_file };
        *LOGGER.lock().unwrap() = Some(logger);
    }

    fn log(&self, level: LogLevel, source: DataSource, site_id: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let site_part = site_id.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!("{} {} {}{}: {}", timestamp, level, source, site_part, message);

        match level {
            LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
            LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>) {
    Logger::init(min_level, log_file.map(String::from));
}

/// Log a general informational message
pub fn info(source: DataSource, site_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Info, source, site_id, message);
    }
}

/// Log a warning. Always captured in the session buffer, and echoed to the
/// configured sinks when the logger is initialized.
pub fn warn(source: DataSource, site_id: Option<&str>, message: &str) {
    let site_part = site_id.map(|s| format!(" [{}]", s)).unwrap_or_default();
    SESSION_WARNINGS
        .lock()
        .unwrap()
        .push(format!("{}{}: {}", source, site_part, message));

    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Warning, source, site_id, message);
    }
}

/// Log an error message
pub fn error(source: DataSource, site_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Error, source, site_id, message);
    }
}

/// Log a debug message
pub fn debug(source: DataSource, site_id: Option<&str>, message: &str) {
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        logger.log(LogLevel::Debug, source, site_id, message);
    }
}

// ---------------------------------------------------------------------------
// Session Warning Buffer
// ---------------------------------------------------------------------------

/// Returns a copy of every warning emitted so far this session, in order.
pub fn session_warnings() -> Vec<String> {
    SESSION_WARNINGS.lock().unwrap().clone()
}

/// Clears the session warning buffer. Call between independent loads.
pub fn clear_session_warnings() {
    SESSION_WARNINGS.lock().unwrap().clear();
}
