use serde::{Deserialize, Serialize};

/// How the image data of a [`WoxImage`] is to be interpreted by Wox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WoxImageType {
    #[default]
    Absolute,
    Relative,
    Base64,
    Svg,
    Url,
    Emoji,
    Lottie,
}

/// Image reference shipped with results, actions and tails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WoxImage {
    #[serde(rename = "ImageType", default)]
    pub image_type: WoxImageType,
    #[serde(rename = "ImageData", default)]
    pub image_data: String,
}

impl WoxImage {
    pub fn new_base64(data: &str) -> Self {
        WoxImage { image_type: WoxImageType::Base64, image_data: data.to_string() }
    }

    pub fn new_emoji(emoji: &str) -> Self {
        WoxImage { image_type: WoxImageType::Emoji, image_data: emoji.to_string() }
    }

    pub fn new_svg(svg: &str) -> Self {
        WoxImage { image_type: WoxImageType::Svg, image_data: svg.to_string() }
    }

    pub fn new_url(url: &str) -> Self {
        WoxImage { image_type: WoxImageType::Url, image_data: url.to_string() }
    }
}
