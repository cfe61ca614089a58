//! Shared test utilities: synthetic images and a scratch project.
//!
//! Images are generated with the `image` crate's own encoders so tests never
//! depend on fixture binaries.
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let project = TempDir::new().unwrap();
//! create_test_png(&project.path().join("img/cat.png"), 400, 300);
//! ```

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;

fn ensure_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
}

/// Write a gradient JPEG (RGB) of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    ensure_parent(path);
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a translucent gradient PNG (RGBA) of the given size.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    ensure_parent(path);
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 200])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}
