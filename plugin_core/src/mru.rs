use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::image::WoxImage;
use crate::result::QueryResult;

/// Callback invoked when Wox asks the plugin to restore a most-recently-used
/// entry into a live result.
pub type MRURestoreFunc = Arc<
    dyn Fn(MRUData) -> BoxFuture<'static, Result<Option<QueryResult>, PluginError>> + Send + Sync,
>;

/// A most-recently-used entry as persisted by Wox.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MRUData {
    #[serde(rename = "PluginID", default)]
    pub plugin_id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "SubTitle", default)]
    pub sub_title: String,
    #[serde(rename = "Icon", default)]
    pub icon: WoxImage,
    #[serde(rename = "ContextData", default)]
    pub context_data: HashMap<String, String>,
}
