//! One-time migration from the pre-vault flat key-value store.
//!
//! Early releases kept everything in a single unstructured JSON file. On
//! startup the records are copied into the vault once, then the legacy
//! file is deleted. The whole step is best-effort: any failure is logged
//! and never blocks the vault from opening.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::LEGACY_STORE_FILE;

use super::records::{ImageAsset, PromptTemplate, WatermarkAsset};
use super::Vault;

/// Location of the legacy flat file for a vault root.
pub fn legacy_path(root: &Path) -> PathBuf {
    root.join(LEGACY_STORE_FILE)
}

/// Shape of the legacy flat file. Every key is optional; unknown keys are
/// ignored.
#[derive(Debug, Default, Deserialize)]
struct LegacyStore {
    #[serde(default)]
    gallery: Vec<ImageAsset>,
    #[serde(default)]
    watermarks: Vec<WatermarkAsset>,
    #[serde(default)]
    templates: Vec<PromptTemplate>,
}

/// Copy records from the legacy flat file into the vault, once.
///
/// Idempotent and safe to call on every boot:
/// - runs only while the legacy file exists
/// - fills only collections that are still empty (vault data wins)
/// - deletes the legacy file only after a clean copy
///
/// Failures are logged at warn and swallowed; a failed migration leaves
/// the legacy file in place for the next attempt.
pub async fn migrate_legacy_if_present(vault: &Vault) {
    let path = legacy_path(vault.root());
    let backend = vault.backend();

    if !backend.file_exists(&path).await {
        return;
    }

    let bytes = match backend.read_file(&path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "cannot read legacy store, skipping migration");
            return;
        }
    };

    let legacy: LegacyStore = match serde_json::from_slice(&bytes) {
        Ok(legacy) => legacy,
        Err(err) => {
            tracing::warn!(error = %err, "legacy store unreadable, leaving it in place");
            return;
        }
    };

    let mut failures = 0usize;
    let mut migrated = 0usize;

    if vault.images().is_empty() {
        for image in legacy.gallery {
            match vault.put_image(image).await {
                Ok(()) => migrated += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to migrate legacy image");
                    failures += 1;
                }
            }
        }
    }
    if vault.watermarks().is_empty() {
        for watermark in legacy.watermarks {
            match vault.put_watermark(watermark).await {
                Ok(()) => migrated += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to migrate legacy watermark");
                    failures += 1;
                }
            }
        }
    }
    if vault.templates().is_empty() {
        for template in legacy.templates {
            match vault.put_template(template).await {
                Ok(()) => migrated += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to migrate legacy template");
                    failures += 1;
                }
            }
        }
    }

    if failures == 0 {
        let _ = backend.delete_file(&path).await;
        if migrated > 0 {
            tracing::info!(records = migrated, "migrated legacy storage into the vault");
        }
    } else {
        tracing::warn!(
            failures,
            "legacy migration incomplete, keeping the legacy file for the next start"
        );
    }
}
