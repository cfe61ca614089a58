//! Pure Rust image processing backend on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (GIF, JPEG, PNG, TIFF, WebP) | `image::load_from_memory_with_format` |
//! | Channel normalization | `DynamicImage::to_rgba8` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality, RGB only) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//! | Encode → GIF, PNG, TIFF, WebP | `DynamicImage::write_to` (lossless encoders) |
//!
//! The input encoding comes from the file extension, never from sniffing the
//! bytes: a `.png` that holds JPEG data fails to decode.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::scaled_height;
use super::params::{Quality, TransformParams};
use crate::format::Format;
use image::DynamicImage;
use image::imageops::FilterType;
use std::io::Cursor;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode `bytes` as `format`, normalized to RGBA8.
///
/// Every decoded image carries an alpha channel afterwards so the resize
/// step always sees four channels regardless of the source encoding.
fn decode(bytes: &[u8], format: Format, path: &Path) -> Result<DynamicImage, BackendError> {
    if !format.is_decodable() {
        return Err(BackendError::UnsupportedFormat(format!(
            "no decoder for {} ({})",
            format,
            path.display()
        )));
    }
    let img = image::load_from_memory_with_format(bytes, format.image_format()).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })?;
    Ok(DynamicImage::ImageRgba8(img.to_rgba8()))
}

/// Decodable registry format for `path`'s extension.
fn input_format(path: &Path) -> Result<Format, BackendError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match Format::from_extension(ext) {
        Some(format) if format.is_decodable() => Ok(format),
        _ => Err(BackendError::UnsupportedFormat(format!(
            "no decoder for {}",
            path.display()
        ))),
    }
}

/// Encode an image into `format`.
fn encode(img: &DynamicImage, format: Format, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut out = Cursor::new(Vec::new());
    let result = match format {
        Format::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.percent());
            rgb.write_with_encoder(encoder)
        }
        Format::Avif => {
            let encoder = image::codecs::avif::AvifEncoder::new_with_speed_quality(
                &mut out,
                6,
                quality.percent(),
            );
            img.write_with_encoder(encoder)
        }
        Format::Gif | Format::Png | Format::Tiff | Format::Webp => {
            img.write_to(&mut out, format.image_format())
        }
    };
    result.map_err(|e| BackendError::ProcessingFailed(format!("{} encode failed: {}", format, e)))?;
    Ok(out.into_inner())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let format = input_format(path)?;
        let mut reader = image::ImageReader::open(path)?;
        reader.set_format(format.image_format());
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
            })?;
        Ok(Dimensions { width, height })
    }

    fn transform(&self, params: &TransformParams) -> Result<Vec<u8>, BackendError> {
        if params.width == 0 {
            return Err(BackendError::ProcessingFailed(
                "target width must be positive".into(),
            ));
        }
        let bytes = std::fs::read(&params.source)?;
        let img = decode(&bytes, params.input, &params.source)?;
        let height = scaled_height((img.width(), img.height()), params.width);
        let resized = img.resize_exact(params.width, height, FilterType::Lanczos3);
        encode(&resized, params.format, params.quality)
    }
}
