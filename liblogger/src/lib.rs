pub mod config;
pub mod logger;
pub mod outputs;

pub use config::{LogConfig, LogLevel};
pub use logger::Logger;

/// Envelope type literal for log frames pushed to Wox over the live
/// WebSocket.
pub const WOX_JSONRPC_TYPE_SYSTEM_LOG: &str = "WOX_JSONRPC_SYSTEM_LOG";
