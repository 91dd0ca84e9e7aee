use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const WOX_JSONRPC_TYPE_REQUEST: &str = "WOX_JSONRPC_TYPE_REQUEST";
pub const WOX_JSONRPC_TYPE_RESPONSE: &str = "WOX_JSONRPC_TYPE_RESPONSE";

/// The frame shape shared by every message on the wire, both directions.
/// Requests carry `Params`; responses echo `Id`/`Method` and carry either
/// `Result` or `Error`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Envelope {
    #[serde(rename = "Type", default)]
    pub msg_type: String,
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Method", default)]
    pub method: String,
    #[serde(rename = "TraceId", default)]
    pub trace_id: String,
    #[serde(rename = "PluginId", default, skip_serializing_if = "String::is_empty")]
    pub plugin_id: String,
    #[serde(rename = "PluginName", default, skip_serializing_if = "String::is_empty")]
    pub plugin_name: String,
    #[serde(rename = "Params", default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, Value>,
    #[serde(rename = "Result", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// Host-originated request to Wox.
    pub fn request(
        trace_id: String,
        id: String,
        method: String,
        params: HashMap<String, Value>,
        plugin_id: String,
        plugin_name: String,
    ) -> Self {
        Envelope {
            msg_type: WOX_JSONRPC_TYPE_REQUEST.to_string(),
            id,
            method,
            trace_id,
            plugin_id,
            plugin_name,
            params,
            ..Envelope::default()
        }
    }

    /// Response to an inbound request: same id and method, and exactly one
    /// of `Result` or `Error`.
    pub fn response(
        trace_id: String,
        id: String,
        method: String,
        result: Result<Value, String>,
    ) -> Self {
        let (result, error) = match result {
            Ok(value) => (Some(value), None),
            Err(message) => (None, Some(message)),
        };
        Envelope {
            msg_type: WOX_JSONRPC_TYPE_RESPONSE.to_string(),
            id,
            method,
            trace_id,
            result,
            error,
            ..Envelope::default()
        }
    }

    /// String param accessor; absent or non-string values read as "".
    pub fn param_str(&self, key: &str) -> String {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }
}
