// Error types module

use std::fmt;

/// Centralized error type for the engine core
///
/// Categorizes errors into the kinds shared across components so callers
/// can map them to user-facing messages and recovery actions. Component
/// modules define their own error enums and convert into this type at the
/// boundary.
#[derive(Debug, Clone)]
pub enum HankoError {
    /// Backing storage could not be opened (disabled, corrupted, missing)
    StoreUnavailable(String),

    /// Backing storage is out of space
    QuotaExceeded(String),

    /// An image or watermark asset could not be decoded into a raster
    Decode(String),

    /// A user-supplied backup file is structurally unusable or fully empty
    InvalidBackup(String),

    /// Export attempted with nothing to export
    EmptyBackup,

    /// A restore step failed; carries the original cause message
    RestoreFailed(String),

    /// Internal errors (archive assembly, unexpected I/O)
    Internal(String),
}

impl fmt::Display for HankoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HankoError::StoreUnavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            HankoError::QuotaExceeded(msg) => write!(f, "Storage quota exceeded: {}", msg),
            HankoError::Decode(msg) => write!(f, "Failed to decode image: {}", msg),
            HankoError::InvalidBackup(msg) => write!(f, "Invalid backup file: {}", msg),
            HankoError::EmptyBackup => write!(f, "Nothing to export: all collections are empty"),
            HankoError::RestoreFailed(msg) => write!(f, "Restore failed: {}", msg),
            HankoError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for HankoError {}

impl HankoError {
    /// Human-readable message suitable for direct display
    ///
    /// Quota exhaustion gets an actionable message (the UI offers to clear
    /// cached images); everything else maps to a generic description of the
    /// failed operation.
    pub fn user_message(&self) -> String {
        match self {
            HankoError::QuotaExceeded(_) => {
                "Local storage is full. Clear cached images or free up disk space, then try again."
                    .to_string()
            }
            HankoError::StoreUnavailable(_) => {
                "Local storage could not be opened. Your saved images and watermarks are temporarily unavailable."
                    .to_string()
            }
            HankoError::InvalidBackup(_) => {
                "This file is not a usable backup. Choose a backup file exported from this app."
                    .to_string()
            }
            HankoError::EmptyBackup => {
                "There is nothing to back up yet. Save an image, watermark or template first."
                    .to_string()
            }
            HankoError::RestoreFailed(_) => {
                "The restore did not complete. Your data may be partially replaced; retry with the same backup file."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<crate::vault::StoreError> for HankoError {
    fn from(err: crate::vault::StoreError) -> Self {
        use crate::vault::StoreError;
        match err {
            StoreError::Unavailable(msg) => HankoError::StoreUnavailable(msg),
            StoreError::QuotaExceeded => HankoError::QuotaExceeded("no space left".to_string()),
            StoreError::Closed => {
                HankoError::StoreUnavailable("connection closed by a newer schema version".to_string())
            }
            other => HankoError::Internal(other.to_string()),
        }
    }
}

impl From<crate::watermark::WatermarkError> for HankoError {
    fn from(err: crate::watermark::WatermarkError) -> Self {
        HankoError::Decode(err.to_string())
    }
}

impl From<crate::backup::BackupError> for HankoError {
    fn from(err: crate::backup::BackupError) -> Self {
        use crate::backup::BackupError;
        match err {
            BackupError::Invalid(msg) => HankoError::InvalidBackup(msg),
            BackupError::Empty => HankoError::EmptyBackup,
            BackupError::RestoreFailed(msg) => HankoError::RestoreFailed(msg),
            BackupError::Serialization(e) => HankoError::Internal(e.to_string()),
        }
    }
}

impl From<crate::batch::BatchError> for HankoError {
    fn from(err: crate::batch::BatchError) -> Self {
        HankoError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HankoError::StoreUnavailable("manifest corrupted".to_string());
        assert_eq!(err.to_string(), "Storage unavailable: manifest corrupted");

        let err = HankoError::Decode("invalid PNG".to_string());
        assert_eq!(err.to_string(), "Failed to decode image: invalid PNG");

        let err = HankoError::EmptyBackup;
        assert_eq!(
            err.to_string(),
            "Nothing to export: all collections are empty"
        );
    }

    #[test]
    fn test_quota_message_is_actionable() {
        // Quota exhaustion must be distinguishable from generic failures
        let quota = HankoError::QuotaExceeded("ENOSPC".to_string());
        assert!(quota.user_message().contains("full"));

        let generic = HankoError::StoreUnavailable("corrupted".to_string());
        assert_ne!(quota.user_message(), generic.user_message());
    }

    #[test]
    fn test_store_error_conversion() {
        let err: HankoError = crate::vault::StoreError::QuotaExceeded.into();
        assert!(matches!(err, HankoError::QuotaExceeded(_)));

        let err: HankoError =
            crate::vault::StoreError::Unavailable("no backing dir".to_string()).into();
        assert!(matches!(err, HankoError::StoreUnavailable(_)));
    }

    #[test]
    fn test_backup_error_conversion() {
        let err: HankoError = crate::backup::BackupError::Empty.into();
        assert!(matches!(err, HankoError::EmptyBackup));

        let err: HankoError =
            crate::backup::BackupError::RestoreFailed("clear failed".to_string()).into();
        assert!(matches!(err, HankoError::RestoreFailed(_)));
    }
}
