use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::image::WoxImage;
use crate::preview::WoxPreview;

/// Callback invoked when the user triggers a result action in Wox.
pub type ActionFunc = Arc<dyn Fn(ActionContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Callback invoked by Wox on the refresh interval: takes the previously
/// displayed refreshable result and returns its next value.
pub type RefreshFunc = Arc<
    dyn Fn(RefreshableResult) -> BoxFuture<'static, Result<RefreshableResult, PluginError>>
        + Send
        + Sync,
>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultTailType {
    #[default]
    Text,
    Image,
}

/// Trailing decoration shown at the right edge of a result row.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct ResultTail {
    #[serde(rename = "Type", default)]
    pub tail_type: ResultTailType,
    #[serde(rename = "Text", default)]
    pub text: String,
    #[serde(rename = "Image", default)]
    pub image: WoxImage,
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "ContextData", default)]
    pub context_data: String,
}

/// Context handed to an action callback.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActionContext {
    #[serde(rename = "ResultId", default)]
    pub result_id: String,
    #[serde(rename = "ActionId", default)]
    pub action_id: String,
    #[serde(rename = "ResultActionId", default)]
    pub result_action_id: String,
    #[serde(rename = "ContextData", default)]
    pub context_data: String,
}

/// A single action a user can trigger on a result. The `action` callback
/// never crosses the wire: the host interns it by id and looks it up when
/// the corresponding `action` frame comes back.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct ResultAction {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Icon", default)]
    pub icon: WoxImage,
    #[serde(rename = "IsDefault", default)]
    pub is_default: bool,
    #[serde(rename = "PreventHideAfterAction", default)]
    pub prevent_hide_after_action: bool,
    #[serde(rename = "Hotkey", default)]
    pub hotkey: String,
    #[serde(rename = "ContextData", default)]
    pub context_data: String,
    #[serde(skip)]
    pub action: Option<ActionFunc>,
}

/// A query result as produced by a plugin. The id may be left blank; the
/// host assigns one before the result leaves the process.
#[derive(Clone, Serialize, Default)]
pub struct QueryResult {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "SubTitle", default)]
    pub sub_title: String,
    #[serde(rename = "Icon", default)]
    pub icon: WoxImage,
    #[serde(rename = "Preview", default)]
    pub preview: WoxPreview,
    #[serde(rename = "Score", default)]
    pub score: f64,
    #[serde(rename = "Group", default)]
    pub group: String,
    #[serde(rename = "GroupScore", default)]
    pub group_score: f64,
    #[serde(rename = "Tails", default)]
    pub tails: Vec<ResultTail>,
    #[serde(rename = "ContextData", default)]
    pub context_data: String,
    #[serde(rename = "Actions", default)]
    pub actions: Vec<ResultAction>,
    /// Milliseconds between refreshes; 0 disables refreshing.
    #[serde(rename = "RefreshInterval", default)]
    pub refresh_interval: i64,
    #[serde(skip)]
    pub on_refresh: Option<RefreshFunc>,
}

/// The refreshable subset of a result, round-tripped through Wox on every
/// `refresh` call. Action callbacks are restored from the host cache after
/// decoding.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct RefreshableResult {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "SubTitle", default)]
    pub sub_title: String,
    #[serde(rename = "Icon", default)]
    pub icon: WoxImage,
    #[serde(rename = "Preview", default)]
    pub preview: WoxPreview,
    #[serde(rename = "Tails", default)]
    pub tails: Vec<ResultTail>,
    #[serde(rename = "ContextData", default)]
    pub context_data: String,
    #[serde(rename = "RefreshInterval", default)]
    pub refresh_interval: i64,
    #[serde(rename = "Actions", default)]
    pub actions: Vec<ResultAction>,
}

/// Partial in-place update of a displayed result, sent via `UpdateResult`.
/// Unset fields are left untouched by Wox and omitted from the wire.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct UpdatableResult {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "SubTitle", default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(rename = "Tails", default, skip_serializing_if = "Option::is_none")]
    pub tails: Option<Vec<ResultTail>>,
    #[serde(rename = "Preview", default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<WoxPreview>,
    #[serde(rename = "Actions", default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ResultAction>>,
}

/// Partial in-place update of a single action, sent via `UpdateResultAction`.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct UpdatableResultAction {
    #[serde(rename = "ResultId", default)]
    pub result_id: String,
    #[serde(rename = "ActionId", default)]
    pub action_id: String,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Icon", default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<WoxImage>,
    #[serde(skip)]
    pub action: Option<ActionFunc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_action() -> ActionFunc {
        Arc::new(|_ctx| Box::pin(async {}))
    }

    #[test]
    fn callbacks_never_serialize() {
        let result = QueryResult {
            id: "r1".into(),
            title: "hello".into(),
            actions: vec![ResultAction {
                id: "a1".into(),
                name: "open".into(),
                action: Some(noop_action()),
                ..ResultAction::default()
            }],
            refresh_interval: 1000,
            on_refresh: Some(Arc::new(|r| Box::pin(async move { Ok(r) }))),
            ..QueryResult::default()
        };

        let encoded = serde_json::to_value(&result).unwrap();
        assert_eq!(encoded["Id"], "r1");
        assert_eq!(encoded["Actions"][0]["Name"], "open");
        assert!(encoded["Actions"][0].get("action").is_none());
        assert!(encoded.get("on_refresh").is_none());

        // every emitted value survives a JSON round trip
        let text = serde_json::to_string(&encoded).unwrap();
        let _reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    }

    #[test]
    fn refreshable_result_round_trip() {
        let wire = r#"{"Title":"t","SubTitle":"s","RefreshInterval":500,
                       "Actions":[{"Id":"a1","Name":"n"}]}"#;
        let decoded: RefreshableResult = serde_json::from_str(wire).unwrap();
        assert_eq!(decoded.title, "t");
        assert_eq!(decoded.refresh_interval, 500);
        assert_eq!(decoded.actions[0].id, "a1");
        assert!(decoded.actions[0].action.is_none());
    }

    #[test]
    fn updatable_result_omits_unset_fields() {
        let update = UpdatableResult {
            id: "r1".into(),
            title: Some("50%".into()),
            ..UpdatableResult::default()
        };
        let encoded = serde_json::to_value(&update).unwrap();
        assert_eq!(encoded["Title"], "50%");
        assert!(encoded.get("SubTitle").is_none());
        assert!(encoded.get("Actions").is_none());
    }
}
