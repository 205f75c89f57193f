//! Site content models edited in the browser.
//!
//! Field names serialize in camelCase to stay byte-compatible with the JSON
//! listings already committed to the site repository. Unknown keys are kept
//! in `extra` so a publish never drops settings this crate does not model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Card style configuration; opaque to the publisher.
pub type CardStyles = Value;

/// `src/config/site-content.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteContent {
    #[serde(default)]
    pub art_images: Vec<ImageRef>,

    #[serde(default)]
    pub background_images: Vec<ImageRef>,

    #[serde(default)]
    pub social_buttons: Vec<SocialButton>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An image slot identified by a stable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    pub url: String,
}

/// A social link button, optionally with a custom icon image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialButton {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Entry of `src/app/projects/list.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub year: i32,
    pub description: String,
    pub image: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm: Option<String>,
}

/// Entry of `src/app/astro/list.json`.
///
/// Older entries carry a single `image`; newer ones an `images` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    pub id: String,
    pub uploaded_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl Picture {
    /// Every image URL this picture references, legacy field included.
    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.image
            .iter()
            .map(String::as_str)
            .chain(self.images.iter().flatten().map(String::as_str))
    }

    /// The image list, falling back to the legacy single image.
    pub fn normalized_images(&self) -> Vec<String> {
        match &self.images {
            Some(images) if !images.is_empty() => images.clone(),
            _ => self.image.iter().cloned().collect(),
        }
    }
}

/// Entry of `src/app/share/list.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Entry of `public/blogs/index.json`; also the per-post `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogIndexItem {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

/// A blog post as edited in the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogPost {
    pub meta: BlogIndexItem,

    /// Markdown body.
    pub markdown: String,
}
