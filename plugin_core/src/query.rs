use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Input,
    Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionType {
    #[default]
    Text,
    File,
}

/// Text or files the user had selected when the query fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Selection {
    #[serde(rename = "Type", default)]
    pub selection_type: SelectionType,
    #[serde(rename = "Text", default)]
    pub text: Option<String>,
    #[serde(rename = "FilePaths", default)]
    pub file_paths: Option<Vec<String>>,
}

/// Environment captured by Wox at query time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QueryEnv {
    #[serde(rename = "ActiveWindowTitle", default)]
    pub active_window_title: String,
    #[serde(rename = "ActiveWindowPid", default)]
    pub active_window_pid: i64,
    /// Only available when the active window is a browser with the Wox
    /// browser extension installed.
    #[serde(rename = "ActiveBrowserUrl", default)]
    pub active_browser_url: String,
}

/// A user query as dispatched to a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Query {
    #[serde(rename = "Type", default)]
    pub query_type: QueryType,
    #[serde(rename = "RawQuery", default)]
    pub raw_query: String,
    #[serde(rename = "TriggerKeyword", default)]
    pub trigger_keyword: Option<String>,
    #[serde(rename = "Command", default)]
    pub command: Option<String>,
    #[serde(rename = "Search", default)]
    pub search: String,
    #[serde(rename = "Selection", default)]
    pub selection: Selection,
    #[serde(rename = "Env", default)]
    pub env: QueryEnv,
}

impl Query {
    /// A global query is plain input without a trigger keyword.
    pub fn is_global_query(&self) -> bool {
        self.query_type == QueryType::Input
            && self.trigger_keyword.as_deref().unwrap_or("").is_empty()
    }
}

/// Parameters for the `ChangeQuery` API call.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChangeQueryParam {
    #[serde(rename = "QueryType", default)]
    pub query_type: QueryType,
    #[serde(rename = "QueryText", default)]
    pub query_text: String,
    #[serde(rename = "QuerySelection", default)]
    pub query_selection: Option<Selection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_query_detection() {
        let query = Query { raw_query: "hello".into(), search: "hello".into(), ..Query::default() };
        assert!(query.is_global_query());

        let keyword = Query { trigger_keyword: Some("wpm".into()), ..Query::default() };
        assert!(!keyword.is_global_query());

        let selection = Query { query_type: QueryType::Selection, ..Query::default() };
        assert!(!selection.is_global_query());
    }

    #[test]
    fn selection_decodes_from_wire_shape() {
        let selection: Selection =
            serde_json::from_str(r#"{"Type":"file","FilePaths":["/tmp/a.txt"]}"#).unwrap();
        assert_eq!(selection.selection_type, SelectionType::File);
        assert_eq!(selection.file_paths.unwrap(), vec!["/tmp/a.txt".to_string()]);
    }

    #[test]
    fn env_tolerates_missing_fields() {
        let env: QueryEnv = serde_json::from_str(r#"{"ActiveWindowTitle":"code"}"#).unwrap();
        assert_eq!(env.active_window_title, "code");
        assert_eq!(env.active_window_pid, 0);
    }
}
