use std::fs::{self, File, OpenOptions};
use std::io::Write;

use chrono::{Duration, Local, NaiveDateTime};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{LogConfig, LogLevel};
use crate::WOX_JSONRPC_TYPE_SYSTEM_LOG;

const ROTATE_STAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Appending line-oriented file writer with size rotation and age-based
/// retention of rotated files.
pub struct FileOutput {
    config: LogConfig,
    file: Option<File>,
    written: u64,
}

impl FileOutput {
    pub fn new(config: LogConfig) -> Self {
        FileOutput { config, file: None, written: 0 }
    }

    fn open(&mut self) -> Result<(), String> {
        fs::create_dir_all(&self.config.log_directory)
            .map_err(|e| format!("failed to create log directory: {}", e))?;

        let path = self.config.log_directory.join(&self.config.file_name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| format!("failed to open log file {}: {}", path.display(), e))?;

        self.written = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.file = Some(file);
        Ok(())
    }

    pub fn write_line(&mut self, line: &str) -> Result<(), String> {
        if self.file.is_none() {
            self.open()?;
        }
        if self.written >= self.config.max_file_size {
            self.rotate()?;
        }

        let file = self.file.as_mut().ok_or("log file not open")?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|e| format!("failed to write to log file: {}", e))?;
        self.written += line.len() as u64 + 1;
        Ok(())
    }

    /// Rename the active file with a timestamp suffix, purge expired
    /// rotations, and reopen a fresh file.
    fn rotate(&mut self) -> Result<(), String> {
        self.file = None;

        let active = self.config.log_directory.join(&self.config.file_name);
        let stamp = Local::now().format(ROTATE_STAMP_FORMAT);
        let rotated = self
            .config
            .log_directory
            .join(format!("{}.{}", self.config.file_name, stamp));
        fs::rename(&active, &rotated)
            .map_err(|e| format!("failed to rotate log file: {}", e))?;

        self.purge_expired();
        self.open()
    }

    /// Delete rotated files whose name stamp is past the retention window.
    /// The stamp in the file name is authoritative so retention does not
    /// depend on filesystem timestamps.
    fn purge_expired(&self) {
        let prefix = format!("{}.", self.config.file_name);
        let cutoff = Local::now().naive_local() - Duration::days(self.config.retention_days);

        let entries = match fs::read_dir(&self.config.log_directory) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(stamp) = name.strip_prefix(&prefix) else { continue };
            if let Ok(stamped) = NaiveDateTime::parse_from_str(stamp, ROTATE_STAMP_FORMAT) {
                if stamped < cutoff {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }
    }

    pub fn flush(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
    }
}

/// Pushes each log record to Wox as a system-log frame on the live
/// WebSocket connection.
pub struct FrameOutput {
    sender: UnboundedSender<String>,
}

impl FrameOutput {
    pub fn new(sender: UnboundedSender<String>) -> Self {
        FrameOutput { sender }
    }

    pub fn emit(&self, trace_id: &str, level: LogLevel, message: &str) -> Result<(), String> {
        let frame = serde_json::json!({
            "Type": WOX_JSONRPC_TYPE_SYSTEM_LOG,
            "TraceId": trace_id,
            "Level": level.as_wire(),
            "Message": message,
        });
        self.sender
            .send(frame.to_string())
            .map_err(|_| "websocket closed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_config(max_file_size: u64) -> LogConfig {
        let dir = std::env::temp_dir().join(format!(
            "liblogger-test-{}-{}",
            std::process::id(),
            max_file_size
        ));
        let _ = fs::remove_dir_all(&dir);
        LogConfig {
            log_directory: dir,
            file_name: "plugin-host.log".to_string(),
            max_file_size,
            retention_days: 3,
        }
    }

    fn rotated_files(dir: &PathBuf) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("plugin-host.log."))
            .collect()
    }

    #[test]
    fn rotates_when_size_exceeded() {
        let config = temp_config(64);
        let dir = config.log_directory.clone();
        let mut output = FileOutput::new(config);

        for i in 0..8 {
            output.write_line(&format!("0123456789 0123456789 line {}", i)).unwrap();
        }
        output.flush();

        assert!(!rotated_files(&dir).is_empty());
        assert!(dir.join("plugin-host.log").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn purges_rotations_past_retention() {
        let config = temp_config(32);
        let dir = config.log_directory.clone();
        fs::create_dir_all(&dir).unwrap();

        // a rotation stamped well past the retention window
        let expired = dir.join("plugin-host.log.2020-01-01-000000");
        fs::write(&expired, b"old").unwrap();

        let mut output = FileOutput::new(config);
        output.write_line("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").unwrap();
        output.write_line("trigger rotation").unwrap();

        assert!(!expired.exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn frame_output_shape() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let output = FrameOutput::new(tx);
        output.emit("trace-1", LogLevel::Info, "hello").unwrap();

        let frame: serde_json::Value =
            serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame["Type"], WOX_JSONRPC_TYPE_SYSTEM_LOG);
        assert_eq!(frame["TraceId"], "trace-1");
        assert_eq!(frame["Level"], "info");
        assert_eq!(frame["Message"], "hello");
    }
}
