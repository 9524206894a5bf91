// ============================================================================
// IMAGE I/O — bitmap decode, frame export, remote-upload encoding
// ============================================================================

use std::fs;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, RgbaImage};
use log::info;

use crate::error::EngineError;
use crate::transform::TransformState;

/// Default quality for user-facing exports (history snapshots use their own,
/// lower default).
pub const DEFAULT_EXPORT_QUALITY: u8 = 95;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    pub fn from_name(name: &str) -> Option<ExportFormat> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }

    /// Infer the format from a path's extension, defaulting to PNG.
    pub fn from_path(path: &Path) -> ExportFormat {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(ExportFormat::from_name)
            .unwrap_or_default()
    }
}

/// Load and decode a bitmap from disk. Any format the `image` crate decodes
/// is accepted; the result is always RGBA8.
pub fn load_bitmap(path: &Path) -> Result<RgbaImage, EngineError> {
    let bytes = fs::read(path)?;
    decode_bitmap(&bytes)
}

/// Decode an in-memory encoded image into a bitmap.
pub fn decode_bitmap(bytes: &[u8]) -> Result<RgbaImage, EngineError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| EngineError::Decode(e.to_string()))?
        .to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(EngineError::Decode("decoded image has zero dimensions".into()));
    }
    Ok(img)
}

/// Lossless PNG encoding, used as the upload payload for remote enhancement.
pub fn encode_png(frame: &RgbaImage) -> Result<Vec<u8>, EngineError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(frame.as_raw(), frame.width(), frame.height(), ColorType::Rgba8)
        .map_err(|e| EngineError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Encode a frame in the requested export format. `quality` applies to JPEG
/// only (1–100).
pub fn encode_frame(
    frame: &RgbaImage,
    format: ExportFormat,
    quality: u8,
) -> Result<Vec<u8>, EngineError> {
    match format {
        ExportFormat::Png => encode_png(frame),
        ExportFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(frame.clone()).to_rgb8();
            let mut bytes = Vec::new();
            JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
                .encode_image(&rgb)
                .map_err(|e| EngineError::Encode(e.to_string()))?;
            Ok(bytes)
        }
    }
}

/// Encode and write a frame to disk.
pub fn export_frame(
    frame: &RgbaImage,
    path: &Path,
    format: ExportFormat,
    quality: u8,
) -> Result<(), EngineError> {
    let bytes = encode_frame(frame, format, quality)?;
    fs::write(path, &bytes)?;
    info!(
        "exported {}x{} frame as {} ({} bytes) to {}",
        frame.width(),
        frame.height(),
        format.extension(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Write the edit parameters as a JSON sidecar next to an export.
pub fn save_params(params: &TransformState, path: &Path) -> Result<(), EngineError> {
    let json = serde_json::to_string_pretty(params)
        .map_err(|e| EngineError::Encode(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

/// Restore edit parameters from a JSON sidecar. Values are range-checked
/// when applied to a session, not here.
pub fn load_params(path: &Path) -> Result<TransformState, EngineError> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| EngineError::Decode(e.to_string()))
}
