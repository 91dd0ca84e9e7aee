use std::path::PathBuf;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Upper-case tag used in the log file.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    /// Lower-case tag used on the wire.
    pub fn as_wire(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Configuration for the file backend.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory the log file lives in.
    pub log_directory: PathBuf,

    /// Base file name; rotated files get a timestamp suffix appended.
    pub file_name: String,

    /// Maximum file size in bytes before rotation.
    pub max_file_size: u64,

    /// Rotated files older than this many days are deleted.
    pub retention_days: i64,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            log_directory: PathBuf::from("logs"),
            file_name: "plugin-host.log".to_string(),
            max_file_size: 100 * 1024 * 1024,
            retention_days: 3,
        }
    }
}

impl LogConfig {
    pub fn with_directory(dir: &str) -> Self {
        LogConfig { log_directory: PathBuf::from(dir), ..LogConfig::default() }
    }
}
