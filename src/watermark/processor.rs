//! Byte-level watermarking entry points.
//!
//! This module wraps the pixel compositor with decode/encode and the
//! fail-open policy: watermarking is an enhancement, never a required
//! step, so any failure degrades to delivering the original image bytes
//! instead of blocking the result.

use image::RgbaImage;

use super::compositor::composite_watermark;
use super::error::WatermarkError;
use super::settings::WatermarkSettings;

/// Decode base and watermark bytes, composite, and re-encode as PNG.
///
/// The image format of each input is sniffed from its bytes. Output is
/// always lossless PNG with the base image's dimensions.
pub fn composite_to_png(
    base_bytes: &[u8],
    watermark_bytes: &[u8],
    settings: &WatermarkSettings,
    margin_fraction: f32,
) -> Result<Vec<u8>, WatermarkError> {
    let base = image::load_from_memory(base_bytes)
        .map_err(|e| WatermarkError::Decode(format!("base image: {e}")))?;
    let watermark = image::load_from_memory(watermark_bytes)
        .map_err(|e| WatermarkError::Decode(format!("watermark: {e}")))?;

    let composited = composite_watermark(&base, &watermark, settings, margin_fraction);
    encode_png(&composited)
}

/// Apply the watermark if possible, otherwise return the original bytes.
///
/// This is the call site policy for normal generation and batch flows:
/// - settings disabled, or no watermark asset -> original bytes
/// - decode/encode failure anywhere -> original bytes, logged at warn
///
/// The caller always gets a deliverable image.
pub fn apply_or_passthrough(
    base_bytes: &[u8],
    watermark_bytes: Option<&[u8]>,
    settings: &WatermarkSettings,
    margin_fraction: f32,
) -> Vec<u8> {
    if !settings.is_enabled {
        return base_bytes.to_vec();
    }

    let watermark_bytes = match watermark_bytes {
        Some(bytes) => bytes,
        None => return base_bytes.to_vec(),
    };

    match composite_to_png(base_bytes, watermark_bytes, settings, margin_fraction) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "watermarking failed, delivering the original image");
            base_bytes.to_vec()
        }
    }
}

/// Encode an RGBA raster as PNG.
fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    use image::codecs::png::PngEncoder;
    use image::ImageEncoder as _;
    use std::io::Cursor;

    let mut output = Cursor::new(Vec::new());
    let encoder = PngEncoder::new(&mut output);

    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| WatermarkError::Encode(format!("png: {e}")))?;

    Ok(output.into_inner())
}
