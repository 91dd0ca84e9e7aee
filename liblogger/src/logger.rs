use std::sync::Mutex;

use chrono::Local;
use once_cell::sync::Lazy;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{LogConfig, LogLevel};
use crate::outputs::{FileOutput, FrameOutput};

static LOGGER_INSTANCE: Lazy<Mutex<LoggerInner>> = Lazy::new(|| {
    Mutex::new(LoggerInner { file: FileOutput::new(LogConfig::default()), frame: None })
});

struct LoggerInner {
    file: FileOutput,
    frame: Option<FrameOutput>,
}

impl LoggerInner {
    fn log(&mut self, trace_id: &str, level: LogLevel, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("{} [{}] {} {}", timestamp, level.as_str(), trace_id, message);
        if let Err(e) = self.file.write_line(&line) {
            eprintln!("{} | logging failed: {}", line, e);
        }

        // A failed frame send is noted in the file only; it must never
        // re-enter the frame path.
        if let Some(frame) = &self.frame {
            if let Err(e) = frame.emit(trace_id, level, message) {
                let _ = self
                    .file
                    .write_line(&format!("failed to send log message through websocket: {}", e));
            }
        }
    }
}

/// Process-wide log sink: a rotating file plus, while a connection is
/// registered, a system-log frame per record on the live WebSocket.
pub struct Logger;

impl Logger {
    /// Point the file backend at the real log directory. Called once at
    /// startup when the directory is known from the command line.
    pub fn update_log_directory(dir: &str) {
        if let Ok(mut logger) = LOGGER_INSTANCE.lock() {
            logger.file = FileOutput::new(LogConfig::with_directory(dir));
        }
    }

    /// Mirror subsequent records to Wox over the given outbound channel.
    pub fn register_frame_sender(sender: UnboundedSender<String>) {
        if let Ok(mut logger) = LOGGER_INSTANCE.lock() {
            logger.frame = Some(FrameOutput::new(sender));
        }
    }

    /// Stop mirroring records; called when the connection goes away.
    pub fn clear_frame_sender() {
        if let Ok(mut logger) = LOGGER_INSTANCE.lock() {
            logger.frame = None;
        }
    }

    pub fn log(trace_id: &str, level: LogLevel, message: &str) {
        match LOGGER_INSTANCE.lock() {
            Ok(mut logger) => logger.log(trace_id, level, message),
            Err(poisoned) => poisoned.into_inner().log(trace_id, level, message),
        }
    }

    pub fn debug(trace_id: &str, message: &str) {
        Self::log(trace_id, LogLevel::Debug, message);
    }

    pub fn info(trace_id: &str, message: &str) {
        Self::log(trace_id, LogLevel::Info, message);
    }

    pub fn warning(trace_id: &str, message: &str) {
        Self::log(trace_id, LogLevel::Warning, message);
    }

    pub fn error(trace_id: &str, message: &str) {
        Self::log(trace_id, LogLevel::Error, message);
    }

    pub fn flush() {
        if let Ok(mut logger) = LOGGER_INSTANCE.lock() {
            logger.file.flush();
        }
    }
}
