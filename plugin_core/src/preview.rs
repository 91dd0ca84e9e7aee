use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WoxPreviewType {
    #[default]
    Markdown,
    Text,
    Image,
    Url,
    File,
}

/// Preview panel content attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WoxPreview {
    #[serde(rename = "PreviewType", default)]
    pub preview_type: WoxPreviewType,
    #[serde(rename = "PreviewData", default)]
    pub preview_data: String,
    #[serde(rename = "PreviewProperties", default)]
    pub preview_properties: HashMap<String, String>,
}

impl WoxPreview {
    pub fn new_markdown(data: &str) -> Self {
        WoxPreview {
            preview_type: WoxPreviewType::Markdown,
            preview_data: data.to_string(),
            preview_properties: HashMap::new(),
        }
    }

    pub fn new_text(data: &str) -> Self {
        WoxPreview {
            preview_type: WoxPreviewType::Text,
            preview_data: data.to_string(),
            preview_properties: HashMap::new(),
        }
    }
}
