//! Position calculation for watermark placement.
//!
//! This module provides the placement math for overlaying a watermark onto
//! a base image: the 9-grid position enum, anchor calculation, fractional
//! edge margins, and aspect-preserving scaling relative to the base width.
//!
//! # Position Modes
//!
//! The 9 grid positions combine two independent axes:
//! {top, center, bottom} x {left, center, right}.
//!
//! # Example
//!
//! ```
//! use hanko::watermark::position::{
//!     calculate_position, ImageDimensions, WatermarkDimensions, WatermarkPosition,
//! };
//!
//! let image = ImageDimensions { width: 800, height: 600 };
//! let watermark = WatermarkDimensions { width: 100, height: 50 };
//!
//! let pos = calculate_position(WatermarkPosition::BottomRight, &image, &watermark, 10);
//! assert_eq!((pos.x, pos.y), (690, 540)); // 800 - 100 - 10, 600 - 50 - 10
//! ```

use serde::{Deserialize, Deserializer, Serialize};

/// Watermark position on the image.
///
/// Serialized as kebab-case strings ("bottom-right"). Deserialization is
/// lenient: unknown strings fall back to [`WatermarkPosition::Center`] so a
/// hand-edited or legacy settings value degrades to a centered watermark
/// instead of failing the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl WatermarkPosition {
    /// All 9 grid positions, row by row.
    pub const ALL: [WatermarkPosition; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::CenterLeft,
        Self::Center,
        Self::CenterRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// The kebab-case wire string for this position.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopCenter => "top-center",
            Self::TopRight => "top-right",
            Self::CenterLeft => "center-left",
            Self::Center => "center",
            Self::CenterRight => "center-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomCenter => "bottom-center",
            Self::BottomRight => "bottom-right",
        }
    }

    /// Parse a position string, falling back to `Center` for anything
    /// unrecognized. Accepts the legacy "middle" spelling for the vertical
    /// center axis.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "top-left" => Self::TopLeft,
            "top-center" => Self::TopCenter,
            "top-right" => Self::TopRight,
            "center-left" | "middle-left" => Self::CenterLeft,
            "center" | "middle" | "middle-center" | "center-center" => Self::Center,
            "center-right" | "middle-right" => Self::CenterRight,
            "bottom-left" => Self::BottomLeft,
            "bottom-center" => Self::BottomCenter,
            "bottom-right" => Self::BottomRight,
            _ => Self::Center,
        }
    }
}

impl<'de> Deserialize<'de> for WatermarkPosition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&value))
    }
}

/// Dimensions of the base image.
#[derive(Debug, Clone, Copy)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of the watermark to be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// A single position where a watermark should be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Convert a margin fraction of the base-image width into pixels.
///
/// The fraction is clamped to [0, 0.5]; a margin beyond half the width
/// would leave no room for the watermark on either axis.
pub fn margin_px(base_width: u32, fraction: f32) -> u32 {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 0.5)
    } else {
        0.0
    };
    (fraction * base_width as f32).round() as u32
}

/// Compute the scaled watermark dimensions for a base image.
///
/// The target width is `scale * base_width`; the target height preserves
/// the watermark's original aspect ratio. Both dimensions are at least one
/// pixel.
pub fn scaled_dimensions(
    base: &ImageDimensions,
    watermark: &WatermarkDimensions,
    scale: f32,
) -> WatermarkDimensions {
    let scale = if scale.is_finite() {
        scale.clamp(0.0, 1.0)
    } else {
        1.0
    };

    let target_width = ((scale * base.width as f32).round() as u32).max(1);
    let aspect = watermark.width.max(1) as f32 / watermark.height.max(1) as f32;
    let target_height = ((target_width as f32 / aspect).round() as u32).max(1);

    WatermarkDimensions {
        width: target_width,
        height: target_height,
    }
}

/// Calculate the anchor position for a watermark placement.
///
/// # Arguments
///
/// * `position` - One of the 9 grid positions
/// * `image` - Dimensions of the base image
/// * `watermark` - Dimensions of the (already scaled) watermark
/// * `margin` - Margin from edges in pixels
///
/// # Returns
///
/// The (x, y) coordinates where the watermark should be placed.
/// Coordinates may be negative if the watermark is larger than the image;
/// callers clamp with [`clamp_to_bounds`].
pub fn calculate_position(
    position: WatermarkPosition,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    margin: u32,
) -> PlacementPosition {
    let img_w = image.width as i32;
    let img_h = image.height as i32;
    let wm_w = watermark.width as i32;
    let wm_h = watermark.height as i32;
    let m = margin as i32;

    // Horizontal axis: left -> margin, right -> width - wm - margin,
    // otherwise centered.
    let x = match position {
        WatermarkPosition::TopLeft
        | WatermarkPosition::CenterLeft
        | WatermarkPosition::BottomLeft => m,
        WatermarkPosition::TopRight
        | WatermarkPosition::CenterRight
        | WatermarkPosition::BottomRight => img_w - wm_w - m,
        _ => (img_w - wm_w) / 2,
    };

    // Vertical axis combines independently with the horizontal one.
    let y = match position {
        WatermarkPosition::TopLeft
        | WatermarkPosition::TopCenter
        | WatermarkPosition::TopRight => m,
        WatermarkPosition::BottomLeft
        | WatermarkPosition::BottomCenter
        | WatermarkPosition::BottomRight => img_h - wm_h - m,
        _ => (img_h - wm_h) / 2,
    };

    PlacementPosition::new(x, y)
}

/// Clamp a position to ensure the watermark stays within image bounds.
///
/// Returns the adjusted position that keeps the watermark box inside
/// `[0, width] x [0, height]` whenever the watermark fits in the image.
pub fn clamp_to_bounds(
    pos: PlacementPosition,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
) -> PlacementPosition {
    let max_x = (image.width as i32 - watermark.width as i32).max(0);
    let max_y = (image.height as i32 - watermark.height as i32).max(0);

    PlacementPosition::new(pos.x.clamp(0, max_x), pos.y.clamp(0, max_y))
}
