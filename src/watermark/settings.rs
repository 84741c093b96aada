//! Watermark settings shared by the compositor, the batch processor and the
//! application shell.
//!
//! The source of truth is a single explicit value passed by reference into
//! every compositing call; there is no ambient global. The app shell owns
//! the value and persists it as JSON beside the vault via [`SettingsFile`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_OPACITY_PERCENT, DEFAULT_SCALE, SETTINGS_FILE};

use super::position::WatermarkPosition;

// Default values
fn default_opacity() -> u8 {
    DEFAULT_OPACITY_PERCENT
}

fn default_scale() -> f32 {
    DEFAULT_SCALE
}

fn default_position() -> WatermarkPosition {
    WatermarkPosition::BottomRight
}

/// Settings controlling automatic watermark application.
///
/// `active_watermark_id` is a weak reference into the vault's watermarks
/// collection: when the referenced asset is deleted the pointer must be
/// cleared via [`WatermarkSettings::detach_watermark`], never left dangling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkSettings {
    /// Id of the watermark asset to apply automatically, if any
    #[serde(rename = "activeWatermarkId", default)]
    pub active_watermark_id: Option<String>,

    /// Opacity in percent, clamped to [0, 100] before use
    #[serde(default = "default_opacity")]
    pub opacity: u8,

    /// Position on the 9-grid
    #[serde(default = "default_position")]
    pub position: WatermarkPosition,

    /// Watermark width as a fraction of the base-image width, clamped to
    /// (0, 1] before use
    #[serde(default = "default_scale")]
    pub scale: f32,

    /// Whether watermarks are applied at all
    #[serde(rename = "isEnabled", default)]
    pub is_enabled: bool,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            active_watermark_id: None,
            opacity: default_opacity(),
            position: default_position(),
            scale: default_scale(),
            is_enabled: false,
        }
    }
}

impl WatermarkSettings {
    /// Opacity as a fraction in [0.0, 1.0].
    pub fn opacity_fraction(&self) -> f32 {
        self.opacity.min(100) as f32 / 100.0
    }

    /// Scale clamped into (0, 1]. Non-finite values fall back to the
    /// default scale rather than poisoning the placement math.
    pub fn effective_scale(&self) -> f32 {
        if !self.scale.is_finite() {
            return default_scale();
        }
        self.scale.clamp(0.0, 1.0)
    }

    /// Clear the active watermark pointer if it references `id`.
    ///
    /// Returns true when the pointer was cleared.
    pub fn detach_watermark(&mut self, id: &str) -> bool {
        if self.active_watermark_id.as_deref() == Some(id) {
            self.active_watermark_id = None;
            return true;
        }
        false
    }

    /// Normalize out-of-range fields in place (opacity above 100, scale
    /// outside (0, 1]). Applied when loading persisted or restored
    /// settings.
    pub fn clamped(mut self) -> Self {
        self.opacity = self.opacity.min(100);
        self.scale = self.effective_scale();
        self
    }
}

/// JSON persistence for [`WatermarkSettings`], stored beside the vault.
///
/// The settings are owned by the application shell, not by the vault, so
/// this file lives outside the collection directories and survives a vault
/// `clear`.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    /// Settings file inside the given data directory.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SETTINGS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable. A corrupt file is logged and treated as absent.
    pub async fn load(&self) -> WatermarkSettings {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<WatermarkSettings>(&bytes) {
                Ok(settings) => settings.clamped(),
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), error = %err, "settings file corrupted, using defaults");
                    WatermarkSettings::default()
                }
            },
            Err(_) => WatermarkSettings::default(),
        }
    }

    /// Persist settings atomically (temp file + rename).
    pub async fn save(&self, settings: &WatermarkSettings) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(settings)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}
