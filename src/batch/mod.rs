//! Batch watermarking over an ordered list of input images.
//!
//! One fixed watermark + settings pair is applied across N inputs, one
//! image at a time. Sequential processing is deliberate: it bounds peak
//! memory to a single decoded raster plus one encoded output in flight,
//! at the cost of wall-clock time. The outputs land in a single ZIP
//! archive under one top-level folder, entry order matching input order.
//!
//! Per-file watermarking failures fail open (the file goes into the
//! archive unwatermarked); only archive assembly itself is fatal, and a
//! fatal failure discards everything - no partial archive is produced.

use std::io::{Cursor, Write};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::constants::ARCHIVE_FOLDER;
use crate::watermark::{apply_or_passthrough, WatermarkSettings};

/// One input file for a batch run.
#[derive(Debug, Clone)]
pub struct BatchInput {
    /// Original filename; reused verbatim as the archive entry name
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl BatchInput {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    /// Assembling the output archive failed; no partial archive exists
    #[error("Archive assembly failed: {0}")]
    Archive(String),
}

/// Apply one watermark + settings pair across the inputs and build the
/// output archive.
///
/// `on_progress` fires once per input after that file completes, with
/// `round(done / total * 100)`: strictly non-decreasing, final call
/// exactly 100. The archive bytes are returned so callers can both test
/// the result and trigger the download side effect themselves.
pub fn process_batch<F>(
    inputs: &[BatchInput],
    watermark: Option<&[u8]>,
    settings: &WatermarkSettings,
    margin_fraction: f32,
    mut on_progress: F,
) -> Result<Vec<u8>, BatchError>
where
    F: FnMut(u8),
{
    let archive_err = |e: &dyn std::fmt::Display| BatchError::Archive(e.to_string());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer
        .add_directory(format!("{ARCHIVE_FOLDER}/"), options)
        .map_err(|e| archive_err(&e))?;

    let total = inputs.len();
    for (index, input) in inputs.iter().enumerate() {
        let output = apply_or_passthrough(&input.bytes, watermark, settings, margin_fraction);

        writer
            .start_file(format!("{ARCHIVE_FOLDER}/{}", input.filename), options)
            .map_err(|e| archive_err(&e))?;
        writer.write_all(&output).map_err(|e| archive_err(&e))?;

        let percent = (((index + 1) as f64 / total as f64) * 100.0).round() as u8;
        on_progress(percent);
        tracing::debug!(file = %input.filename, percent, "batch file complete");
    }

    let cursor = writer.finish().map_err(|e| archive_err(&e))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::WatermarkPosition;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, color);
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn settings() -> WatermarkSettings {
        WatermarkSettings {
            active_watermark_id: Some("wm-1".to_string()),
            opacity: 80,
            position: WatermarkPosition::BottomRight,
            scale: 0.2,
            is_enabled: true,
        }
    }

    fn inputs(n: usize) -> Vec<BatchInput> {
        (0..n)
            .map(|i| {
                BatchInput::new(
                    format!("image-{i}.png"),
                    png_bytes(60, 60, Rgba([255, 255, 255, 255])),
                )
            })
            .collect()
    }

    fn entry_names(archive_bytes: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(archive_bytes.to_vec())).unwrap();
        archive.file_names().map(String::from).collect()
    }

    // Test: progress fires once per file, non-decreasing, ending at 100
    #[test]
    fn test_progress_sequence() {
        let wm = png_bytes(8, 8, Rgba([255, 0, 0, 255]));
        let mut progress = Vec::new();

        process_batch(&inputs(3), Some(&wm), &settings(), 0.05, |p| {
            progress.push(p)
        })
        .unwrap();

        assert_eq!(progress, vec![33, 67, 100]);
    }

    #[test]
    fn test_progress_monotonic_for_many_files() {
        let wm = png_bytes(8, 8, Rgba([255, 0, 0, 255]));
        let mut progress = Vec::new();

        process_batch(&inputs(7), Some(&wm), &settings(), 0.05, |p| {
            progress.push(p)
        })
        .unwrap();

        assert_eq!(progress.len(), 7);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*progress.last().unwrap(), 100);
    }

    // Test: archive entries keep the input order and filenames
    #[test]
    fn test_archive_entries_match_inputs() {
        let wm = png_bytes(8, 8, Rgba([255, 0, 0, 255]));
        let archive = process_batch(&inputs(3), Some(&wm), &settings(), 0.05, |_| {}).unwrap();

        let names = entry_names(&archive);
        let files: Vec<&String> = names.iter().filter(|n| n.ends_with(".png")).collect();
        assert_eq!(
            files,
            vec![
                "watermarked/image-0.png",
                "watermarked/image-1.png",
                "watermarked/image-2.png"
            ]
        );
        // Everything lives under the single top-level folder
        assert!(names.iter().all(|n| n.starts_with("watermarked/")));
    }

    // Test: a bad input degrades to "no watermark" for that file only
    #[test]
    fn test_bad_watermark_fails_open_per_file() {
        let mut batch = inputs(2);
        batch[1].bytes = b"not an image".to_vec();
        let original_bad = batch[1].bytes.clone();

        let wm = png_bytes(8, 8, Rgba([255, 0, 0, 255]));
        let archive = process_batch(&batch, Some(&wm), &settings(), 0.05, |_| {}).unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut bad_entry = Vec::new();
        std::io::Read::read_to_end(
            &mut zip.by_name("watermarked/image-1.png").unwrap(),
            &mut bad_entry,
        )
        .unwrap();

        // The undecodable input is carried through unchanged
        assert_eq!(bad_entry, original_bad);
    }

    #[test]
    fn test_watermark_is_applied_to_entries() {
        let wm = png_bytes(8, 8, Rgba([255, 0, 0, 255]));
        let batch = vec![BatchInput::new(
            "photo.png",
            png_bytes(100, 100, Rgba([255, 255, 255, 255])),
        )];

        let archive = process_batch(&batch, Some(&wm), &settings(), 0.05, |_| {}).unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(
            &mut zip.by_name("watermarked/photo.png").unwrap(),
            &mut bytes,
        )
        .unwrap();

        let rgba = image::load_from_memory(&bytes).unwrap().to_rgba8();
        // Bottom-right quadrant carries the red watermark
        let marked = rgba.get_pixel(85, 85);
        assert!(marked[0] > 200 && marked[1] < 150);
        // Top-left quadrant untouched
        let clean = rgba.get_pixel(10, 10);
        assert_eq!(clean[1], 255);
    }

    #[test]
    fn test_empty_input_produces_empty_archive() {
        let wm = png_bytes(8, 8, Rgba([255, 0, 0, 255]));
        let mut progress = Vec::new();

        let archive = process_batch(&[], Some(&wm), &settings(), 0.05, |p| progress.push(p)).unwrap();

        // No files -> no progress callbacks, just the folder entry
        assert!(progress.is_empty());
        let names = entry_names(&archive);
        assert_eq!(names, vec!["watermarked/"]);
    }

    // Test: identical runs produce byte-identical archives
    #[test]
    fn test_batch_is_deterministic() {
        let wm = png_bytes(8, 8, Rgba([255, 0, 0, 255]));
        let batch = inputs(2);

        let first = process_batch(&batch, Some(&wm), &settings(), 0.05, |_| {}).unwrap();
        let second = process_batch(&batch, Some(&wm), &settings(), 0.05, |_| {}).unwrap();
        assert_eq!(first, second);
    }
}
