/// Structured logging for the air quality service
///
/// Provides context-rich logging with data source and station identifiers,
/// timestamps, and severity levels. Supports both console output
/// and file-based logging for cron and server operation.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
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
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Umweltbundesamt air quality API
    Uba,
    Bluesky,
    /// Inbound trigger (HTTP or cron)
    Trigger,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Uba => write!(f, "UBA"),
            DataSource::Bluesky => write!(f, "BSKY"),
            DataSource::Trigger => write!(f, "HTTP"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - no new values published yet, station in maintenance
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        *lock_logger() = Some(logger);
    }

    /// Format a log entry as written to the log file
    fn format_entry(
        level: LogLevel,
        source: &DataSource,
        station: Option<&str>,
        message: &str,
    ) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let station_part = station.map(|s| format!(" [{}]", s)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, source, station_part, message)
    }

    /// Log a message with the global logger
    fn log(&self, level: LogLevel, source: &DataSource, station: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, source, station, message);
        let station_part = station.map(|s| format!(" [{}]", s)).unwrap_or_default();

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => println!("   {}", log_entry),
                LogLevel::Debug => println!("   [DEBUG] {}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, station_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, station_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

/// A poisoned lock only means a previous holder panicked mid-log; the
/// logger itself holds no state that could be left half-written.
fn lock_logger() -> MutexGuard<'static, Option<Logger>> {
    LOGGER.lock().unwrap_or_else(|e| e.into_inner())
}

fn dispatch(level: LogLevel, source: DataSource, station: Option<&str>, message: &str) {
    if let Some(logger) = lock_logger().as_ref() {
        logger.log(level, &source, station, message);
    }
}

/// Log a general informational message
pub fn info(source: DataSource, station: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, source, station, message);
}

/// Log a warning message
pub fn warn(source: DataSource, station: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, source, station, message);
}

/// Log an error message
pub fn error(source: DataSource, station: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, source, station, message);
}

/// Log a debug message
pub fn debug(source: DataSource, station: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, source, station, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a UBA fetch failure based on the error message
pub fn classify_uba_failure(error_message: &str) -> FailureType {
    // The UBA publishes hourly values with a delay; shortly after local
    // midnight the window can legitimately be empty.
    if error_message.contains("No data available") {
        FailureType::Expected
    } else if error_message.contains("HTTP error")
        || error_message.contains("Transport error")
        || error_message.contains("Parse error")
    {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Classify a Bluesky publish failure
pub fn classify_bluesky_failure(error_message: &str) -> FailureType {
    if error_message.contains("Missing configuration")
        || error_message.contains("Authentication failed")
    {
        FailureType::Unexpected
    } else if error_message.contains("HTTP") || error_message.contains("Transport") {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

fn log_classified(
    source: DataSource,
    station: Option<&str>,
    failure_type: FailureType,
    message: &str,
) {
    match failure_type {
        FailureType::Expected => info(source, station, message),
        FailureType::Unexpected => error(source, station, message),
        FailureType::Unknown => warn(source, station, message),
    }
}

/// Log a UBA fetch failure with automatic classification
pub fn log_uba_failure(station_id: &str, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_uba_failure(&error_msg);
    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);
    log_classified(DataSource::Uba, Some(station_id), failure_type, &message);
}

/// Log a Bluesky publish failure with classification
pub fn log_bluesky_failure(operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_bluesky_failure(&error_msg);
    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);
    log_classified(DataSource::Bluesky, None, failure_type, &message);
}

// ---------------------------------------------------------------------------
// Report Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one rendered report
pub fn log_report_summary(station_id: &str, rendered: usize, skipped: usize) {
    let message = format!(
        "Report rendered: {} components, {} skipped",
        rendered,
        skipped
    );

    if skipped == 0 {
        info(DataSource::Uba, Some(station_id), &message);
    } else if rendered == 0 {
        error(DataSource::Uba, Some(station_id), &message);
    } else {
        warn(DataSource::Uba, Some(station_id), &message);
    }
}
