//! Watermark module: deterministic compositing of a watermark asset onto a
//! base image.
//!
//! # Features
//!
//! - **9-grid positioning** with independent horizontal and vertical axes
//! - **Width-relative scaling** that preserves the watermark aspect ratio
//! - **Fractional edge margins** (final composite and live preview use
//!   different fractions, both explicit parameters)
//! - **Fail-open byte pipeline**: watermarking never blocks image delivery
//!
//! The compositor is a pure function; all policy (enabled flag, active
//! asset lookup, fail-open) lives in [`processor`].

pub mod compositor;
pub mod error;
pub mod position;
pub mod processor;
pub mod settings;

// Re-export main types for convenience
pub use compositor::{blend_at, composite_watermark};
pub use error::WatermarkError;
pub use position::{
    calculate_position, clamp_to_bounds, margin_px, scaled_dimensions, ImageDimensions,
    PlacementPosition, WatermarkDimensions, WatermarkPosition,
};
pub use processor::{apply_or_passthrough, composite_to_png};
pub use settings::{SettingsFile, WatermarkSettings};
