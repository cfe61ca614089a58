//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the pipeline needs:
//! identify (native dimensions, no pixel work) and transform (decode, resize,
//! re-encode to bytes). Writing the bytes anywhere is not the backend's job.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) on top of the `image`
//! crate.

use super::params::TransformParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can serve concurrent resolutions on a rayon pool.
pub trait ImageBackend: Sync {
    /// Get native image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Produce the encoded bytes of one variant.
    fn transform(&self, params: &TransformParams) -> Result<Vec<u8>, BackendError>;
}

impl<B: ImageBackend + ?Sized> ImageBackend for &B {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        (**self).identify(path)
    }

    fn transform(&self, params: &TransformParams) -> Result<Vec<u8>, BackendError> {
        (**self).transform(params)
    }
}
