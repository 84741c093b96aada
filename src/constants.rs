// Constants module - centralized default values for the engine
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers improves maintainability
// and makes it easier to understand and modify defaults.

// =============================================================================
// Compositing defaults
// =============================================================================

/// Edge margin for final composites, as a fraction of the base-image width
pub const COMPOSITE_MARGIN_FRACTION: f32 = 0.05;

/// Edge margin for the in-canvas live preview, as a fraction of the
/// base-image width. The preview sits closer to the edge than the final
/// composite; the two values are intentional variants and must not be
/// silently unified.
pub const PREVIEW_MARGIN_FRACTION: f32 = 0.02;

/// Default watermark opacity in percent
pub const DEFAULT_OPACITY_PERCENT: u8 = 50;

/// Default watermark scale, as a fraction of the base-image width
pub const DEFAULT_SCALE: f32 = 0.2;

// =============================================================================
// Vault defaults
// =============================================================================

/// Current schema version of the vault layout
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Manifest file name inside the vault root
pub const MANIFEST_FILE: &str = "manifest.json";

/// Settings file name, stored beside the vault (owned by the app shell)
pub const SETTINGS_FILE: &str = "settings.json";

/// Persisted ordering index for the templates collection
pub const TEMPLATE_ORDER_FILE: &str = "templates.order.json";

/// Flat key-value file used by installations that predate the vault
pub const LEGACY_STORE_FILE: &str = "legacy_store.json";

/// Collection names used by the backup pipeline and UI
pub const IMAGES_COLLECTION: &str = "images";
pub const WATERMARKS_COLLECTION: &str = "watermarks";
pub const TEMPLATES_COLLECTION: &str = "templates";

// =============================================================================
// Backup defaults
// =============================================================================

/// Format version written into exported backup documents
pub const BACKUP_FORMAT_VERSION: u32 = 2;

// =============================================================================
// Batch defaults
// =============================================================================

/// Top-level folder name inside the batch output archive
pub const ARCHIVE_FOLDER: &str = "watermarked";
