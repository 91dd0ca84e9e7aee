use std::error::Error as StdError;
use std::fmt;

/// Error type surfaced to plugins: load problems, failed API calls to Wox,
/// and anything the plugin itself wants to report.
#[derive(Debug, Clone)]
pub enum PluginError {
    /// The plugin library could not be located or loaded
    Load(String),

    /// An outbound API call was answered with an error by Wox
    Api(String),

    /// A wire payload could not be encoded or decoded
    Json(String),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::Load(msg) => write!(f, "load error: {}", msg),
            PluginError::Api(msg) => write!(f, "api error: {}", msg),
            PluginError::Json(msg) => write!(f, "json error: {}", msg),
            PluginError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for PluginError {}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        PluginError::Json(err.to_string())
    }
}

impl From<String> for PluginError {
    fn from(msg: String) -> Self {
        PluginError::Other(msg)
    }
}

impl From<&str> for PluginError {
    fn from(msg: &str) -> Self {
        PluginError::Other(msg.to_string())
    }
}
