use std::error::Error as StdError;
use std::fmt;

use plugin_core::PluginError;

/// Host-side error taxonomy. Everything here ends up as the `Error` string
/// on a response envelope; the `Display` text is the wire contract.
#[derive(Debug)]
pub enum HostError {
    /// Request named a method outside the handler table
    UnknownMethod(String),

    /// Request named a plugin id with no registry entry
    PluginNotFound(String),

    /// Plugin library could not be resolved, loaded or bound
    Load(String),

    /// A plugin call failed
    Plugin(PluginError),

    /// Wire payload could not be encoded or decoded
    Json(serde_json::Error),

    /// The connection went away under an outbound frame
    Send(String),

    /// Anything else surfaced as a plain message
    Other(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::UnknownMethod(method) => {
                write!(f, "unknown method handler: {}", method)
            }
            HostError::PluginNotFound(name) => {
                write!(f, "plugin not found: {}, forget to load plugin?", name)
            }
            HostError::Load(msg) => write!(f, "{}", msg),
            HostError::Plugin(err) => write!(f, "{}", err),
            HostError::Json(err) => write!(f, "{}", err),
            HostError::Send(msg) => write!(f, "{}", msg),
            HostError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for HostError {}

impl From<PluginError> for HostError {
    fn from(err: PluginError) -> Self {
        HostError::Plugin(err)
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::Json(err)
    }
}
