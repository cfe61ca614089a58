//! Raster transform adapter: the only place pixels are touched.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions`, format from extension |
//! | **Decode** | `image::load_from_memory_with_format`, format from extension |
//! | **Resize** | `DynamicImage::resize_exact` with `Lanczos3`, height from aspect |
//! | **Encode** | per-format `image` encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a transform
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The `transform(source, format, width, quality)` contract

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::scaled_height;
pub use operations::{get_dimensions, plan_transform, transform};
pub use params::{Quality, TransformParams};
pub use rust_backend::RustBackend;
