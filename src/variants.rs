//! Variant algebra: pure functions over [`ImageVariant`] lists.
//!
//! A transformer produces a flat list of variants (every format at every
//! size). Rendering a `<picture>` needs one `<source>` per MIME type:
//!
//! ```text
//! [png 400, png 800, jpeg 400, jpeg 800]
//!   → merge_by_type →  image/png:  [png 400, png 800]
//!                      image/jpeg: [jpeg 400, jpeg 800]
//!   → to_src_set    →  <source type="image/png"  srcset="a 400w,b 800w">
//!                      <source type="image/jpeg" srcset="c 400w,d 800w">
//! ```
//!
//! Grouping is stable: types appear in first-seen order and each group keeps
//! input order. Nothing here sorts by width; callers that need ascending
//! widths sort before grouping.

use crate::format::Mime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    #[error("Cannot build a srcset from zero variants")]
    EmptyVariantList,
}

/// One rendition of an image at a specific width and type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageVariant {
    pub path: String,
    pub width: u32,
    #[serde(rename = "type")]
    pub mime: Mime,
}

impl ImageVariant {
    pub fn new(path: impl Into<String>, width: u32, mime: Mime) -> Self {
        Self {
            path: path.into(),
            width,
            mime,
        }
    }

    /// `"<path> <width>w"`
    pub fn src_set_part(&self) -> String {
        format!("{} {}w", self.path, self.width)
    }
}

/// The original image: its URL and native dimensions.
///
/// `width`/`height` describe the untransformed source and are what a
/// renderer reserves the aspect-ratio box from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource<T = ()> {
    pub source: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<T>,
}

/// A single value or a list, as transformers may return either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        OneOrMany::Many(values)
    }
}

/// Normalize a single value or list into a list, without reordering.
pub fn ensure_array<T>(value: OneOrMany<T>) -> Vec<T> {
    match value {
        OneOrMany::One(v) => vec![v],
        OneOrMany::Many(vs) => vs,
    }
}

/// Turns an image source into variants.
pub trait Transformer<T = ()> {
    fn transform(&self, source: &ImageSource<T>) -> OneOrMany<ImageVariant>;
}

/// Run `transformer` on `source` and normalize the result.
pub fn create_image_variants<T>(
    source: &ImageSource<T>,
    transformer: &impl Transformer<T>,
) -> Vec<ImageVariant> {
    ensure_array(transformer.transform(source))
}

/// Group variants by MIME type, keeping first-seen type order and the input
/// order within each group.
pub fn merge_by_type(variants: &[ImageVariant]) -> Vec<(Mime, Vec<ImageVariant>)> {
    let mut groups: Vec<(Mime, Vec<ImageVariant>)> = Vec::new();
    for variant in variants {
        match groups.iter_mut().find(|(mime, _)| *mime == variant.mime) {
            Some((_, group)) => group.push(variant.clone()),
            None => groups.push((variant.mime, vec![variant.clone()])),
        }
    }
    groups
}

/// Join `"<path> <width>w"` entries with commas, in input order.
pub fn to_src_set(variants: &[ImageVariant]) -> Result<String, VariantError> {
    if variants.is_empty() {
        return Err(VariantError::EmptyVariantList);
    }
    Ok(variants
        .iter()
        .map(ImageVariant::src_set_part)
        .collect::<Vec<_>>()
        .join(","))
}

/// One `<source type=... srcset=...>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PictureSource {
    #[serde(rename = "type")]
    pub mime: Mime,
    pub srcset: String,
}

/// Group `variants` by type and build one [`PictureSource`] per group.
pub fn picture_sources(variants: &[ImageVariant]) -> Result<Vec<PictureSource>, VariantError> {
    if variants.is_empty() {
        return Err(VariantError::EmptyVariantList);
    }
    merge_by_type(variants)
        .into_iter()
        .map(|(mime, group)| {
            Ok(PictureSource {
                mime,
                srcset: to_src_set(&group)?,
            })
        })
        .collect()
}
