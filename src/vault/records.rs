//! Record types stored in the vault.
//!
//! All three record kinds serialize to the same JSON shapes used by the
//! backup document, with binary payloads carried as base64 strings.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serde adapter carrying `Vec<u8>` as a base64 string field.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// A saved gallery image: pixels plus the prompt that produced them.
///
/// Created when the user saves a generated result. Mutated only to add or
/// remove tags; deleted explicitly or by a full restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub id: String,

    #[serde(rename = "base64Data", with = "base64_bytes")]
    pub data: Vec<u8>,

    pub mime_type: String,

    /// Creation time, epoch milliseconds
    #[serde(rename = "timestamp")]
    pub created_at_ms: i64,

    pub prompt: String,

    /// Set semantics: duplicates are rejected, order is irrelevant
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ImageAsset {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data,
            mime_type: mime_type.into(),
            created_at_ms: Utc::now().timestamp_millis(),
            prompt: prompt.into(),
            tags: Vec::new(),
            width: None,
            height: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Add a tag; returns false if the tag was already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.tags.iter().any(|t| t == &tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Remove a tag; returns false if the tag was not present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A reusable watermark image. The pixel format is sniffed from the data
/// when the asset is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkAsset {
    pub id: String,

    pub name: String,

    #[serde(rename = "base64Data", with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl WatermarkAsset {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            data,
        }
    }
}

/// A prompt template; `body` may contain a single substitution marker.
///
/// Templates form an ordered list; the order is user-controlled and
/// persisted by the vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,

    pub name: String,

    #[serde(rename = "template")]
    pub body: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            body: body.into(),
        }
    }
}
