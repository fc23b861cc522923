use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rating stored when the page shows no bottle rating.
pub const NO_RATING: &str = "No rating";

/// Brand used when the detail header carries no brand element.
pub const UNKNOWN_BRAND: &str = "Unknown";

/// One catalog item, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub description_links: Vec<DescriptionLink>,
    #[serde(default)]
    pub notes: Notes,
    pub rating: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub accords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_image: Option<AssetReference>,
    #[serde(default)]
    pub additional_images: Vec<AssetReference>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub perfumers: Vec<String>,
    /// Ids of related records. They may not exist in the store.
    #[serde(default)]
    pub similar_ids: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}

/// A link found inside the description body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionLink {
    pub text: String,
    /// Relative to the site origin.
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notes {
    pub top: Vec<String>,
    pub heart: Vec<String>,
    pub base: Vec<String>,
    pub additional: Vec<String>,
}

impl Notes {
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.heart.is_empty() && self.base.is_empty() && self.additional.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub title: String,
    pub body: String,
}

/// The part of an asset a downloaded file represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRole {
    Main,
    Additional,
}

/// Local path of a downloaded asset, e.g. `images/Aventus_main.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetReference(pub String);

impl AssetReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name component, as served under `/assets/{name}`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit(['/', '\\']).next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for AssetReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Projection returned by the item list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub name: String,
    pub id: String,
}

/// A brand link from the brand index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub name: String,
    pub url: String,
}
