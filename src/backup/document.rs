//! The portable backup document.
//!
//! This is the only externally-facing serialized format. It must remain
//! forward-readable: every field is defaulted so a document written by an
//! older (or newer) release still parses - only structural garbage is
//! rejected, and that happens in [`super::validate`], not here.

use serde::{Deserialize, Serialize};

use crate::vault::{ImageAsset, PromptTemplate, WatermarkAsset};
use crate::watermark::WatermarkSettings;

fn default_version() -> u32 {
    1
}

/// A complete snapshot of the vault plus the standalone watermark
/// settings, serialized as a single JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    /// Format version; documents predating the field read as version 1
    #[serde(default = "default_version")]
    pub version: u32,

    /// Creation time, epoch milliseconds
    #[serde(default)]
    pub timestamp: i64,

    #[serde(default)]
    pub watermarks: Vec<WatermarkAsset>,

    #[serde(rename = "watermarkSettings", default)]
    pub watermark_settings: Option<WatermarkSettings>,

    #[serde(default)]
    pub gallery: Vec<ImageAsset>,

    #[serde(default)]
    pub templates: Vec<PromptTemplate>,
}

impl BackupDocument {
    /// True when the document carries no records at all (settings alone do
    /// not count - there is nothing worth restoring).
    pub fn is_empty(&self) -> bool {
        self.gallery.is_empty() && self.watermarks.is_empty() && self.templates.is_empty()
    }

    /// Total record count across all three collections.
    pub fn record_count(&self) -> usize {
        self.gallery.len() + self.watermarks.len() + self.templates.len()
    }
}
