//! Vault module: durable keyed storage for the three record collections.
//!
//! # Features
//!
//! - **Three collections** (`images`, `watermarks`, `templates`), each keyed
//!   by record id, backed by one JSON file per record plus an in-memory
//!   index
//! - **Idempotent upsert and delete**: overwriting an id or deleting a
//!   missing id is never an error
//! - **Secondary queries** on images (recency, tag membership) and a
//!   persisted user-controlled order for templates
//! - **One-way schema ratchet**: opening at a higher version creates newly
//!   introduced collections and never drops existing data
//! - **Version-conflict discipline**: when a newer manifest is observed on
//!   disk, this connection closes and refuses writes instead of corrupting
//!   state
//!
//! Open failure is surfaced as [`StoreError::Unavailable`] (quota
//! exhaustion separately as [`StoreError::QuotaExceeded`]) so callers can
//! degrade gracefully instead of crashing.

pub mod backend;
pub mod error;
pub mod legacy;
pub mod records;

pub use backend::{StorageBackend, TokioFsBackend};
pub use error::StoreError;
pub use legacy::migrate_legacy_if_present;
pub use records::{ImageAsset, PromptTemplate, WatermarkAsset};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants::{
    IMAGES_COLLECTION, LEGACY_STORE_FILE, MANIFEST_FILE, TEMPLATES_COLLECTION,
    TEMPLATE_ORDER_FILE, WATERMARKS_COLLECTION,
};

/// Logical collection kinds held by the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Images,
    Watermarks,
    Templates,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Self::Images, Self::Watermarks, Self::Templates];

    /// The directory / logical name of this collection.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Images => IMAGES_COLLECTION,
            Self::Watermarks => WATERMARKS_COLLECTION,
            Self::Templates => TEMPLATES_COLLECTION,
        }
    }

    /// Schema version this collection first appeared in.
    fn introduced_in(&self) -> u32 {
        match self {
            Self::Images | Self::Watermarks => 1,
            Self::Templates => 2,
        }
    }

    /// Collections that exist at the given schema version.
    fn for_version(version: u32) -> impl Iterator<Item = Collection> {
        Self::ALL
            .into_iter()
            .filter(move |c| c.introduced_in() <= version)
    }
}

/// Direction for adjacent-swap template reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// On-disk schema manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    collections: Vec<String>,
}

/// Durable keyed storage for images, watermarks and prompt templates.
pub struct Vault {
    backend: Arc<dyn StorageBackend>,
    root: PathBuf,
    version: u32,
    closed: AtomicBool,
    images: RwLock<HashMap<String, ImageAsset>>,
    watermarks: RwLock<HashMap<String, WatermarkAsset>>,
    templates: RwLock<HashMap<String, PromptTemplate>>,
    template_order: RwLock<Vec<String>>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("root", &self.root)
            .field("version", &self.version)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// Open (or create) a vault at `root` with the given schema version,
    /// using the portable tokio filesystem backend.
    pub async fn open(root: impl Into<PathBuf>, version: u32) -> Result<Self, StoreError> {
        Self::open_with_backend(Arc::new(TokioFsBackend::new()), root, version).await
    }

    /// Open (or create) a vault with an explicit storage backend.
    ///
    /// Schema upgrade is a one-way ratchet: a higher requested version
    /// creates the collections introduced since the stored version and
    /// rewrites the manifest; existing collections are never dropped. If
    /// the stored manifest is already *newer* than the requested version,
    /// another context owns the store - the connection opens for reading
    /// but every write returns [`StoreError::Closed`].
    pub async fn open_with_backend(
        backend: Arc<dyn StorageBackend>,
        root: impl Into<PathBuf>,
        version: u32,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        backend
            .create_dir_all(&root)
            .await
            .map_err(|e| StoreError::Unavailable(format!("cannot create {}: {e}", root.display())))?;

        let manifest_path = root.join(MANIFEST_FILE);
        let stored = if backend.file_exists(&manifest_path).await {
            let bytes = backend
                .read_file(&manifest_path)
                .await
                .map_err(|e| StoreError::Unavailable(format!("cannot read manifest: {e}")))?;
            let manifest: Manifest = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Unavailable(format!("manifest corrupted: {e}")))?;
            Some(manifest)
        } else {
            None
        };

        let newer_on_disk = stored.as_ref().map(|m| m.version > version).unwrap_or(false);
        if newer_on_disk {
            tracing::warn!(
                requested = version,
                stored = stored.as_ref().map(|m| m.version),
                "a newer schema version owns this vault, opening read-only"
            );
        } else {
            for collection in Collection::for_version(version) {
                backend
                    .create_dir_all(&root.join(collection.name()))
                    .await
                    .map_err(|e| {
                        StoreError::Unavailable(format!(
                            "cannot create collection {}: {e}",
                            collection.name()
                        ))
                    })?;
            }

            let needs_manifest = match &stored {
                Some(m) => m.version < version,
                None => true,
            };
            if needs_manifest {
                let manifest = Manifest {
                    version,
                    collections: Collection::for_version(version)
                        .map(|c| c.name().to_string())
                        .collect(),
                };
                let json = serde_json::to_vec_pretty(&manifest)?;
                backend
                    .write_file_atomic(&manifest_path, Bytes::from(json))
                    .await
                    .map_err(|e| StoreError::Unavailable(format!("cannot write manifest: {e}")))?;
            }
        }

        let vault = Self {
            backend,
            root,
            version,
            closed: AtomicBool::new(newer_on_disk),
            images: RwLock::new(HashMap::new()),
            watermarks: RwLock::new(HashMap::new()),
            templates: RwLock::new(HashMap::new()),
            template_order: RwLock::new(Vec::new()),
        };
        vault.load_collections().await;
        Ok(vault)
    }

    /// The vault's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Schema version this connection was opened with.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether this connection has stopped accepting writes.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// True when all three collections hold no records.
    pub fn is_empty(&self) -> bool {
        self.images.read().is_empty()
            && self.watermarks.read().is_empty()
            && self.templates.read().is_empty()
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// Insert or overwrite an image by id (idempotent upsert).
    pub async fn put_image(&self, image: ImageAsset) -> Result<(), StoreError> {
        self.ensure_writable().await?;
        self.write_record(Collection::Images, &image.id, &image).await?;
        self.images.write().insert(image.id.clone(), image);
        Ok(())
    }

    /// All images, in no guaranteed order.
    pub fn images(&self) -> Vec<ImageAsset> {
        self.images.read().values().cloned().collect()
    }

    /// Images ordered newest first. Ties break on id so the order is
    /// stable across calls.
    pub fn images_by_recency(&self) -> Vec<ImageAsset> {
        let mut images = self.images();
        images.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        images
    }

    /// Images carrying the given tag, newest first.
    pub fn images_with_tag(&self, tag: &str) -> Vec<ImageAsset> {
        self.images_by_recency()
            .into_iter()
            .filter(|img| img.has_tag(tag))
            .collect()
    }

    pub fn get_image(&self, id: &str) -> Option<ImageAsset> {
        self.images.read().get(id).cloned()
    }

    /// Remove an image; removing a missing id is not an error.
    pub async fn delete_image(&self, id: &str) -> Result<(), StoreError> {
        self.ensure_writable().await?;
        self.backend
            .delete_file(&self.record_path(Collection::Images, id))
            .await?;
        self.images.write().remove(id);
        Ok(())
    }

    /// Add a tag to an image; returns false when the image is missing or
    /// already carries the tag.
    pub async fn add_image_tag(&self, id: &str, tag: &str) -> Result<bool, StoreError> {
        self.ensure_writable().await?;
        let Some(mut image) = self.get_image(id) else {
            return Ok(false);
        };
        if !image.add_tag(tag) {
            return Ok(false);
        }
        self.write_record(Collection::Images, id, &image).await?;
        self.images.write().insert(id.to_string(), image);
        Ok(true)
    }

    /// Remove a tag from an image; returns false when nothing changed.
    pub async fn remove_image_tag(&self, id: &str, tag: &str) -> Result<bool, StoreError> {
        self.ensure_writable().await?;
        let Some(mut image) = self.get_image(id) else {
            return Ok(false);
        };
        if !image.remove_tag(tag) {
            return Ok(false);
        }
        self.write_record(Collection::Images, id, &image).await?;
        self.images.write().insert(id.to_string(), image);
        Ok(true)
    }

    // =========================================================================
    // Watermarks
    // =========================================================================

    /// Insert or overwrite a watermark by id (idempotent upsert).
    pub async fn put_watermark(&self, watermark: WatermarkAsset) -> Result<(), StoreError> {
        self.ensure_writable().await?;
        self.write_record(Collection::Watermarks, &watermark.id, &watermark)
            .await?;
        self.watermarks
            .write()
            .insert(watermark.id.clone(), watermark);
        Ok(())
    }

    /// All watermarks, in no guaranteed order.
    pub fn watermarks(&self) -> Vec<WatermarkAsset> {
        self.watermarks.read().values().cloned().collect()
    }

    pub fn get_watermark(&self, id: &str) -> Option<WatermarkAsset> {
        self.watermarks.read().get(id).cloned()
    }

    /// Remove a watermark; removing a missing id is not an error.
    ///
    /// The caller owns the settings object and must detach a dangling
    /// active-watermark reference
    /// ([`crate::watermark::WatermarkSettings::detach_watermark`]).
    pub async fn delete_watermark(&self, id: &str) -> Result<(), StoreError> {
        self.ensure_writable().await?;
        self.backend
            .delete_file(&self.record_path(Collection::Watermarks, id))
            .await?;
        self.watermarks.write().remove(id);
        Ok(())
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Insert or overwrite a template by id (idempotent upsert). New ids
    /// append to the end of the persisted order.
    pub async fn put_template(&self, template: PromptTemplate) -> Result<(), StoreError> {
        self.ensure_writable().await?;
        self.write_record(Collection::Templates, &template.id, &template)
            .await?;

        let is_new = self
            .templates
            .write()
            .insert(template.id.clone(), template.clone())
            .is_none();
        if is_new {
            self.template_order.write().push(template.id);
            self.persist_template_order().await?;
        }
        Ok(())
    }

    /// Templates in their persisted user-controlled order.
    pub fn templates(&self) -> Vec<PromptTemplate> {
        let order = self.template_order.read();
        let templates = self.templates.read();
        order
            .iter()
            .filter_map(|id| templates.get(id).cloned())
            .collect()
    }

    pub fn get_template(&self, id: &str) -> Option<PromptTemplate> {
        self.templates.read().get(id).cloned()
    }

    /// Remove a template; removing a missing id is not an error.
    pub async fn delete_template(&self, id: &str) -> Result<(), StoreError> {
        self.ensure_writable().await?;
        self.backend
            .delete_file(&self.record_path(Collection::Templates, id))
            .await?;
        let existed = self.templates.write().remove(id).is_some();
        if existed {
            self.template_order.write().retain(|t| t != id);
            self.persist_template_order().await?;
        }
        Ok(())
    }

    /// Swap a template with its neighbor. Returns false when the template
    /// is missing or already at the boundary.
    pub async fn move_template(
        &self,
        id: &str,
        direction: MoveDirection,
    ) -> Result<bool, StoreError> {
        self.ensure_writable().await?;
        {
            let mut order = self.template_order.write();
            let Some(index) = order.iter().position(|t| t == id) else {
                return Ok(false);
            };
            let target = match direction {
                MoveDirection::Up => index.checked_sub(1),
                MoveDirection::Down => {
                    if index + 1 < order.len() {
                        Some(index + 1)
                    } else {
                        None
                    }
                }
            };
            let Some(target) = target else {
                return Ok(false);
            };
            order.swap(index, target);
        }
        self.persist_template_order().await?;
        Ok(true)
    }

    // =========================================================================
    // Whole-collection operations
    // =========================================================================

    /// Remove every record in a collection. Used by restore.
    pub async fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        self.ensure_writable().await?;

        let ids: Vec<String> = match collection {
            Collection::Images => self.images.read().keys().cloned().collect(),
            Collection::Watermarks => self.watermarks.read().keys().cloned().collect(),
            Collection::Templates => self.templates.read().keys().cloned().collect(),
        };
        for id in &ids {
            self.backend
                .delete_file(&self.record_path(collection, id))
                .await?;
        }

        match collection {
            Collection::Images => self.images.write().clear(),
            Collection::Watermarks => self.watermarks.write().clear(),
            Collection::Templates => {
                self.templates.write().clear();
                self.template_order.write().clear();
                self.backend
                    .delete_file(&self.root.join(TEMPLATE_ORDER_FILE))
                    .await?;
            }
        }
        Ok(())
    }

    /// Delete the pre-vault flat key-value file, if any. Used by restore
    /// to clean up legacy state along with the collections.
    pub async fn clear_legacy(&self) -> Result<(), StoreError> {
        self.ensure_writable().await?;
        self.backend
            .delete_file(&self.root.join(LEGACY_STORE_FILE))
            .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    pub(crate) fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Refuse writes once a newer schema version owns the store.
    ///
    /// Re-checks the on-disk manifest so an upgrade performed by another
    /// execution context after this connection opened is detected too;
    /// detection closes the connection permanently.
    async fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }

        let manifest_path = self.root.join(MANIFEST_FILE);
        if let Ok(bytes) = self.backend.read_file(&manifest_path).await {
            if let Ok(manifest) = serde_json::from_slice::<Manifest>(&bytes) {
                if manifest.version > self.version {
                    self.closed.store(true, Ordering::SeqCst);
                    tracing::warn!(
                        ours = self.version,
                        theirs = manifest.version,
                        "newer schema version detected, closing vault connection"
                    );
                    return Err(StoreError::Closed);
                }
            }
        }
        Ok(())
    }

    fn record_path(&self, collection: Collection, id: &str) -> PathBuf {
        self.root.join(collection.name()).join(record_file_name(id))
    }

    async fn write_record<T: Serialize>(
        &self,
        collection: Collection,
        id: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(record)?;
        self.backend
            .write_file_atomic(&self.record_path(collection, id), Bytes::from(json))
            .await
    }

    async fn persist_template_order(&self) -> Result<(), StoreError> {
        let order = self.template_order.read().clone();
        let json = serde_json::to_vec_pretty(&order)?;
        self.backend
            .write_file_atomic(&self.root.join(TEMPLATE_ORDER_FILE), Bytes::from(json))
            .await
    }

    /// Load all record files into the in-memory index. Individual corrupt
    /// records are skipped with a warning so one bad file cannot take the
    /// whole vault down.
    async fn load_collections(&self) {
        for collection in Collection::ALL {
            let dir = self.root.join(collection.name());
            let entries = match self.backend.read_dir(&dir).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for path in entries {
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let bytes = match self.backend.read_file(&path).await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "skipping unreadable record");
                        continue;
                    }
                };
                if let Err(err) = self.load_record(collection, &bytes) {
                    tracing::warn!(path = %path.display(), error = %err, "skipping corrupt record");
                }
            }
        }

        // Recover the template order; ids missing from the index are
        // dropped, templates missing from the order are appended sorted so
        // the result is deterministic.
        let order_path = self.root.join(TEMPLATE_ORDER_FILE);
        let mut order: Vec<String> = match self.backend.read_file(&order_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        {
            let templates = self.templates.read();
            order.retain(|id| templates.contains_key(id));
            let mut missing: Vec<String> = templates
                .keys()
                .filter(|id| !order.contains(id))
                .cloned()
                .collect();
            missing.sort();
            order.extend(missing);
        }
        *self.template_order.write() = order;
    }

    fn load_record(&self, collection: Collection, bytes: &[u8]) -> Result<(), serde_json::Error> {
        match collection {
            Collection::Images => {
                let record: ImageAsset = serde_json::from_slice(bytes)?;
                self.images.write().insert(record.id.clone(), record);
            }
            Collection::Watermarks => {
                let record: WatermarkAsset = serde_json::from_slice(bytes)?;
                self.watermarks.write().insert(record.id.clone(), record);
            }
            Collection::Templates => {
                let record: PromptTemplate = serde_json::from_slice(bytes)?;
                self.templates.write().insert(record.id.clone(), record);
            }
        }
        Ok(())
    }
}

/// Encode a record id into a safe file name, preserving alphanumerics and
/// a few path-safe characters and percent-encoding everything else.
fn record_file_name(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len() + 5);
    for c in id.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => encoded.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).as_bytes() {
                    encoded.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    encoded.push_str(".json");
    encoded
}
