//! High-level image operations.
//!
//! These functions validate a request, build [`TransformParams`] and call
//! the backend. They are the adapter contract the resolver programs against:
//! `transform(source, format, width, quality) -> bytes`.

use super::backend::{BackendError, ImageBackend};
use super::params::{Quality, TransformParams};
use crate::format::Format;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Plan a transform without executing it.
///
/// The input encoding is inferred from the extension of `source`; an
/// extension outside the registry is [`BackendError::UnsupportedFormat`].
pub fn plan_transform(
    source: &Path,
    format: Format,
    width: u32,
    quality: Quality,
) -> Result<TransformParams> {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let input = Format::from_extension(ext).ok_or_else(|| {
        BackendError::UnsupportedFormat(format!("unrecognized extension: {}", source.display()))
    })?;

    Ok(TransformParams {
        source: source.to_path_buf(),
        input,
        format,
        width,
        quality,
    })
}

/// Produce one encoded variant of `source`.
pub fn transform(
    backend: &impl ImageBackend,
    source: &Path,
    format: Format,
    width: u32,
    quality: Quality,
) -> Result<Vec<u8>> {
    let params = plan_transform(source, format, width, quality)?;
    backend.transform(&params)
}
