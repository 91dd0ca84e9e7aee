use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Callback fired when a plugin setting changes in Wox. Arguments are the
/// setting key and its new value.
pub type SettingChangedFunc = Arc<dyn Fn(String, String) + Send + Sync>;

/// Callback resolving a dynamic setting definition by key.
pub type DynamicSettingFunc = Arc<dyn Fn(String) -> PluginSettingDefinitionItem + Send + Sync>;

/// Callback fired when Wox routes a deep link to the plugin. The argument
/// is the parsed query parameter map.
pub type DeepLinkFunc = Arc<dyn Fn(HashMap<String, String>) + Send + Sync>;

/// Teardown hook registered via `OnUnload`, fired when the plugin is
/// unloaded from the host.
pub type UnloadFunc = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// A query command advertised through `RegisterQueryCommands`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetadataCommand {
    #[serde(rename = "Command", default)]
    pub command: String,
    #[serde(rename = "Description", default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PluginSettingDefinitionType {
    Head,
    #[default]
    Textbox,
    Checkbox,
    Select,
    Label,
    Newline,
    Table,
    Dynamic,
}

/// One entry of a plugin's setting form. Dynamic entries are resolved at
/// display time through the `OnGetDynamicSetting` callback.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PluginSettingDefinitionItem {
    #[serde(rename = "Type", default)]
    pub definition_type: PluginSettingDefinitionType,
    #[serde(rename = "Value", default)]
    pub value: HashMap<String, serde_json::Value>,
    #[serde(rename = "DisabledInPlatforms", default)]
    pub disabled_in_platforms: Vec<String>,
    #[serde(rename = "IsPlatformSpecific", default)]
    pub is_platform_specific: bool,
}
