use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TRACE_ID_KEY: &str = "traceId";

/// Request-scoped key/value bag passed into every plugin call and every
/// outbound API call. The trace id it carries is stamped on all log lines
/// and frames belonging to the same logical request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "Values")]
    pub values: HashMap<String, String>,
}

impl Context {
    /// Create a new context with a random trace id.
    pub fn new() -> Self {
        Self::new_with_trace_id(Uuid::new_v4().to_string())
    }

    /// Create a new context carrying the given trace id.
    pub fn new_with_trace_id(trace_id: String) -> Self {
        let mut values = HashMap::new();
        values.insert(TRACE_ID_KEY.to_string(), trace_id);
        Context { values }
    }

    pub fn get_trace_id(&self) -> String {
        self.values.get(TRACE_ID_KEY).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.values.get(key)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_has_trace_id() {
        let ctx = Context::new();
        assert!(!ctx.get_trace_id().is_empty());
    }

    #[test]
    fn trace_id_is_preserved() {
        let ctx = Context::new_with_trace_id("t-123".to_string());
        assert_eq!(ctx.get_trace_id(), "t-123");
    }
}
