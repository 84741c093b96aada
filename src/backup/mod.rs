//! Backup pipeline: whole-vault export, validation, and destructive
//! restore.
//!
//! # Features
//!
//! - **Export** assembles all three collections plus the standalone
//!   watermark settings into one portable JSON document
//! - **Validate** parses arbitrary user-supplied bytes defensively:
//!   missing fields default, only structural garbage or a fully empty
//!   document is rejected
//! - **Restore** is replace-all: the vault is cleared before the document
//!   is written back; there is no merge and no rollback
//!
//! Unlike watermarking, these are user-initiated data-integrity
//! operations: errors propagate to the caller instead of failing open.

pub mod document;

pub use document::BackupDocument;

use chrono::Utc;
use thiserror::Error;

use crate::constants::BACKUP_FORMAT_VERSION;
use crate::vault::{Collection, Vault};
use crate::watermark::{SettingsFile, WatermarkSettings};

#[derive(Error, Debug)]
pub enum BackupError {
    /// The supplied file is not a usable backup document
    #[error("Invalid backup file: {0}")]
    Invalid(String),

    /// Export attempted while all three collections are empty
    #[error("Nothing to export: the vault is empty")]
    Empty,

    /// A restore step failed; carries the original cause message
    #[error("Restore failed: {0}")]
    RestoreFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Serialize the whole vault and settings into backup-document bytes.
///
/// Returns [`BackupError::Empty`] when there is nothing worth exporting;
/// no bytes are produced in that case, and the caller must not trigger a
/// download.
pub fn export(vault: &Vault, settings: &WatermarkSettings) -> Result<Vec<u8>, BackupError> {
    if vault.is_empty() {
        return Err(BackupError::Empty);
    }

    let doc = BackupDocument {
        version: BACKUP_FORMAT_VERSION,
        timestamp: Utc::now().timestamp_millis(),
        watermarks: vault.watermarks(),
        watermark_settings: Some(settings.clone()),
        gallery: vault.images_by_recency(),
        templates: vault.templates(),
    };

    let bytes = serde_json::to_vec_pretty(&doc)?;
    tracing::info!(records = doc.record_count(), "exported backup document");
    Ok(bytes)
}

/// Parse user-supplied bytes as a backup document.
///
/// Missing optional fields never fail - they default per the document
/// format. Rejected with [`BackupError::Invalid`] only when the bytes are
/// not parseable structured data or when every collection is empty after
/// defaulting.
pub fn validate(bytes: &[u8]) -> Result<BackupDocument, BackupError> {
    let doc: BackupDocument = serde_json::from_slice(bytes)
        .map_err(|e| BackupError::Invalid(format!("not a backup document: {e}")))?;

    if doc.is_empty() {
        return Err(BackupError::Invalid(
            "backup contains no images, watermarks or templates".to_string(),
        ));
    }

    Ok(doc)
}

/// Destructively replace the vault contents with a validated document.
///
/// Steps: clear all three collections, clear legacy pre-vault keys, write
/// the settings if the document carries any, then bulk-insert templates,
/// watermarks and images. Any failure is rethrown as
/// [`BackupError::RestoreFailed`] wrapping the cause; no rollback is
/// attempted, so the vault is left in whatever partial state existed at
/// the point of failure and the caller should retry from the same file.
pub async fn restore(
    vault: &Vault,
    settings_file: &SettingsFile,
    doc: BackupDocument,
) -> Result<(), BackupError> {
    let wrap = |e: &dyn std::fmt::Display| BackupError::RestoreFailed(e.to_string());

    for collection in Collection::ALL {
        vault.clear(collection).await.map_err(|e| wrap(&e))?;
    }
    vault.clear_legacy().await.map_err(|e| wrap(&e))?;

    if let Some(mut settings) = doc.watermark_settings {
        // Never restore a dangling active-watermark reference
        if let Some(active) = settings.active_watermark_id.clone() {
            if !doc.watermarks.iter().any(|w| w.id == active) {
                settings.active_watermark_id = None;
            }
        }
        settings_file
            .save(&settings.clamped())
            .await
            .map_err(|e| wrap(&e))?;
    }

    // Small, cheap collections first; order is not a correctness
    // requirement beyond everything landing before restore returns.
    for template in doc.templates {
        vault.put_template(template).await.map_err(|e| wrap(&e))?;
    }
    for watermark in doc.watermarks {
        vault.put_watermark(watermark).await.map_err(|e| wrap(&e))?;
    }
    let image_count = doc.gallery.len();
    for image in doc.gallery {
        vault.put_image(image).await.map_err(|e| wrap(&e))?;
    }

    tracing::info!(images = image_count, "restore complete");
    Ok(())
}
