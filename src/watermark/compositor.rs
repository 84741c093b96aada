//! Watermark compositor for blending a watermark onto a base image.
//!
//! The compositing entry point is a pure function: given the same base
//! raster, watermark raster and settings it always produces byte-identical
//! output. There is no hidden state and no randomness; the resize filter is
//! fixed.
//!
//! # Algorithm
//!
//! 1. Output dimensions equal the base image exactly.
//! 2. The watermark is scaled to `scale * base_width`, preserving its
//!    aspect ratio (Lanczos3).
//! 3. The anchor comes from the 9-grid position with a fractional edge
//!    margin, then is clamped so the box stays inside the base image.
//! 4. The watermark is alpha-blended with a uniform extra opacity; the
//!    base image stays fully opaque.

use image::{imageops::FilterType, DynamicImage, Rgba, RgbaImage};

use super::position::{
    calculate_position, clamp_to_bounds, margin_px, scaled_dimensions, ImageDimensions,
    PlacementPosition, WatermarkDimensions,
};
use super::settings::WatermarkSettings;

/// Composite a watermark onto a base image according to the settings.
///
/// Returns a new RGBA raster with the exact dimensions of `base`; the base
/// is never resized or cropped. The watermark is assumed to carry its own
/// alpha channel; `settings.opacity` is applied uniformly on top of it.
///
/// `margin_fraction` is the edge margin as a fraction of the base-image
/// width: [`crate::constants::COMPOSITE_MARGIN_FRACTION`] for final
/// composites, [`crate::constants::PREVIEW_MARGIN_FRACTION`] for the live
/// preview path.
pub fn composite_watermark(
    base: &DynamicImage,
    watermark: &DynamicImage,
    settings: &WatermarkSettings,
    margin_fraction: f32,
) -> RgbaImage {
    let mut output = base.to_rgba8();

    let base_dims = ImageDimensions {
        width: output.width(),
        height: output.height(),
    };
    let source_dims = WatermarkDimensions {
        width: watermark.width(),
        height: watermark.height(),
    };

    let target = scaled_dimensions(&base_dims, &source_dims, settings.effective_scale());
    let scaled = watermark
        .resize_exact(target.width, target.height, FilterType::Lanczos3)
        .to_rgba8();

    let margin = margin_px(base_dims.width, margin_fraction);
    let pos = calculate_position(settings.position, &base_dims, &target, margin);
    let pos = clamp_to_bounds(pos, &base_dims, &target);

    blend_at(&mut output, &scaled, pos, settings.opacity_fraction());
    output
}

/// Blend a watermark raster onto the target image at a fixed position.
///
/// The blit is clipped to the target bounds; out-of-range parts of the
/// watermark are simply not drawn.
pub fn blend_at(target: &mut RgbaImage, watermark: &RgbaImage, pos: PlacementPosition, opacity: f32) {
    let target_width = target.width() as i32;
    let target_height = target.height() as i32;

    let wm_width = watermark.width() as i32;
    let wm_height = watermark.height() as i32;

    // Visible region, clamped to target bounds
    let x_start = pos.x.max(0);
    let y_start = pos.y.max(0);
    let x_end = (pos.x + wm_width).min(target_width);
    let y_end = (pos.y + wm_height).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wx = (tx - pos.x) as u32;
            let wy = (ty - pos.y) as u32;

            let wm_pixel = watermark.get_pixel(wx, wy);
            let target_pixel = target.get_pixel(tx as u32, ty as u32);

            let blended = blend_pixels(*target_pixel, *wm_pixel, opacity);
            target.put_pixel(tx as u32, ty as u32, blended);
        }
    }
}

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    // Apply additional opacity to foreground alpha
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;

    // Porter-Duff "over" operator
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::position::WatermarkPosition;

    fn create_test_image(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(width, height, color)
    }

    fn settings(position: WatermarkPosition, opacity: u8, scale: f32) -> WatermarkSettings {
        WatermarkSettings {
            active_watermark_id: None,
            opacity,
            position,
            scale,
            is_enabled: true,
        }
    }

    // Test: alpha blend watermark onto image
    #[test]
    fn test_alpha_blend_simple() {
        // White background
        let mut target = create_test_image(100, 100, Rgba([255, 255, 255, 255]));
        // Red watermark with 50% alpha
        let watermark = create_test_image(20, 20, Rgba([255, 0, 0, 128]));

        blend_at(&mut target, &watermark, PlacementPosition::new(0, 0), 1.0);

        let pixel = target.get_pixel(10, 10);
        // With 50% alpha red over white, we get pinkish
        assert!(pixel[0] > 200); // Red channel stays high
        assert!(pixel[1] > 100); // Green is blended
        assert!(pixel[2] > 100); // Blue is blended
        assert_eq!(pixel[3], 255); // Alpha stays full
    }

    #[test]
    fn test_alpha_blend_with_opacity() {
        let mut target = create_test_image(100, 100, Rgba([0, 0, 0, 255]));
        // Fully opaque white watermark at 50% extra opacity
        let watermark = create_test_image(20, 20, Rgba([255, 255, 255, 255]));

        blend_at(&mut target, &watermark, PlacementPosition::new(0, 0), 0.5);

        // Should be around 128 (50% of white over black)
        let pixel = target.get_pixel(10, 10);
        assert!(pixel[0] > 100 && pixel[0] < 160);
        assert!(pixel[1] > 100 && pixel[1] < 160);
        assert!(pixel[2] > 100 && pixel[2] < 160);
    }

    // Test: handle transparent watermark pixels
    #[test]
    fn test_transparent_watermark() {
        let mut target = create_test_image(100, 100, Rgba([255, 0, 0, 255]));
        let watermark = create_test_image(20, 20, Rgba([0, 255, 0, 0]));

        blend_at(&mut target, &watermark, PlacementPosition::new(40, 40), 1.0);

        // Target unchanged (watermark fully transparent)
        let pixel = target.get_pixel(50, 50);
        assert_eq!(pixel[0], 255);
        assert_eq!(pixel[1], 0);
        assert_eq!(pixel[2], 0);
    }

    // Test: watermark clipping at image edges
    #[test]
    fn test_watermark_clipping() {
        let mut target = create_test_image(50, 50, Rgba([255, 255, 255, 255]));
        let watermark = create_test_image(30, 30, Rgba([255, 0, 0, 255]));

        // Only the top-left 10x10 of the watermark lands inside
        blend_at(&mut target, &watermark, PlacementPosition::new(40, 40), 1.0);

        let pixel_visible = target.get_pixel(45, 45);
        assert_eq!(pixel_visible[0], 255);
        assert_eq!(pixel_visible[1], 0);

        let pixel_outside = target.get_pixel(30, 30);
        assert_eq!(pixel_outside[0], 255);
        assert_eq!(pixel_outside[1], 255);
    }

    #[test]
    fn test_negative_position_clips() {
        let mut target = create_test_image(50, 50, Rgba([255, 255, 255, 255]));
        let watermark = create_test_image(30, 30, Rgba([255, 0, 0, 255]));

        blend_at(&mut target, &watermark, PlacementPosition::new(-20, -20), 1.0);

        let pixel_visible = target.get_pixel(5, 5);
        assert_eq!(pixel_visible[0], 255);
        assert_eq!(pixel_visible[1], 0);

        let pixel_outside = target.get_pixel(20, 20);
        assert_eq!(pixel_outside[1], 255);
    }

    // Test: zero opacity leaves the base untouched
    #[test]
    fn test_zero_opacity() {
        let base = DynamicImage::ImageRgba8(create_test_image(100, 100, Rgba([255, 255, 255, 255])));
        let watermark = DynamicImage::ImageRgba8(create_test_image(20, 20, Rgba([255, 0, 0, 255])));

        let out = composite_watermark(
            &base,
            &watermark,
            &settings(WatermarkPosition::Center, 0, 0.2),
            0.05,
        );

        assert_eq!(out, base.to_rgba8());
    }

    // Test: output dimensions always equal the base image
    #[test]
    fn test_output_dimensions_match_base() {
        let base = DynamicImage::ImageRgba8(create_test_image(123, 77, Rgba([10, 20, 30, 255])));
        let watermark = DynamicImage::ImageRgba8(create_test_image(64, 64, Rgba([255, 0, 0, 255])));

        let out = composite_watermark(
            &base,
            &watermark,
            &settings(WatermarkPosition::BottomRight, 80, 0.5),
            0.05,
        );

        assert_eq!(out.width(), 123);
        assert_eq!(out.height(), 77);
    }

    // Test: same inputs produce byte-identical output
    #[test]
    fn test_compositing_is_deterministic() {
        let base = DynamicImage::ImageRgba8(create_test_image(200, 150, Rgba([200, 180, 160, 255])));
        let watermark =
            DynamicImage::ImageRgba8(create_test_image(40, 30, Rgba([0, 0, 255, 180])));
        let s = settings(WatermarkPosition::BottomRight, 80, 0.2);

        let first = composite_watermark(&base, &watermark, &s, 0.05);
        let second = composite_watermark(&base, &watermark, &s, 0.05);

        assert_eq!(first.as_raw(), second.as_raw());
    }

    // Test: scale-1 watermark still lands fully inside the base
    #[test]
    fn test_full_scale_clamps_inside() {
        let base = DynamicImage::ImageRgba8(create_test_image(80, 80, Rgba([255, 255, 255, 255]))); 
        let watermark = DynamicImage::ImageRgba8(create_test_image(40, 40, Rgba([0, 255, 0, 255])));

        let out = composite_watermark(
            &base,
            &watermark,
            &settings(WatermarkPosition::BottomRight, 100, 1.0),
            0.05,
        );

        // The watermark spans the full width; clamping pins it to x = 0
        let pixel = out.get_pixel(0, 40);
        assert_eq!(pixel[1], 255);
    }

    // Test: bottom-right placement lands in the bottom-right quadrant
    #[test]
    fn test_bottom_right_placement() {
        let base = DynamicImage::ImageRgba8(create_test_image(100, 100, Rgba([255, 255, 255, 255])));
        let watermark = DynamicImage::ImageRgba8(create_test_image(16, 16, Rgba([255, 0, 0, 255])));

        let out = composite_watermark(
            &base,
            &watermark,
            &settings(WatermarkPosition::BottomRight, 100, 0.2),
            0.05,
        );

        // margin = 5, target = 20x20 -> box at (75, 75)..(95, 95)
        let inside = out.get_pixel(85, 85);
        assert_eq!(inside[0], 255);
        assert_eq!(inside[1], 0);

        // Top-left quadrant untouched
        let outside = out.get_pixel(20, 20);
        assert_eq!(outside[1], 255);
    }

    #[test]
    fn test_preview_margin_sits_closer_to_edge() {
        let base = DynamicImage::ImageRgba8(create_test_image(200, 200, Rgba([255, 255, 255, 255])));
        let watermark = DynamicImage::ImageRgba8(create_test_image(20, 20, Rgba([255, 0, 0, 255])));
        let s = settings(WatermarkPosition::BottomRight, 100, 0.1);

        // Final composite margin 5% = 10px -> box starts at x = 170.
        let final_pass = composite_watermark(&base, &watermark, &s, 0.05);
        // Preview margin 2% = 4px -> box starts at x = 176.
        let preview = composite_watermark(&base, &watermark, &s, 0.02);

        assert_eq!(final_pass.get_pixel(172, 185)[0], 255);
        assert_eq!(final_pass.get_pixel(172, 185)[1], 0);

        // At x = 172 the preview box has not started yet
        assert_eq!(preview.get_pixel(172, 185)[1], 255);
        assert_eq!(preview.get_pixel(178, 185)[1], 0);
    }

    // Test: blend pixels function directly
    #[test]
    fn test_blend_pixels_direct() {
        // 50% alpha white over black = gray
        let bg = Rgba([0, 0, 0, 255]);
        let fg = Rgba([255, 255, 255, 128]);
        let result = blend_pixels(bg, fg, 1.0);

        assert!(result[0] > 100 && result[0] < 160);
        assert!(result[1] > 100 && result[1] < 160);
        assert!(result[2] > 100 && result[2] < 160);
        assert_eq!(result[3], 255);
    }
}
