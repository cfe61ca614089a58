//! Remote images: variant URLs built from a template, no pixels touched.
//!
//! A remote image is named by a seed (an id, a slug, a path on an image
//! CDN). [`TemplateTransformer`] expands one URL per configured
//! `(format, size)` pair, formats outer and sizes inner, the same order
//! the local transformer module uses.
//!
//! ```text
//! template: https://picsum.photos/seed/{seed}/{width}/{height}.{ext}
//! seed:     cat, native 1200x900, sizes [400, 800], formats [jpeg]
//!   → https://picsum.photos/seed/cat/400/300.jpg   400w image/jpeg
//!   → https://picsum.photos/seed/cat/800/600.jpg   800w image/jpeg
//! ```

use crate::config::RemoteConfig;
use crate::format::Format;
use crate::imaging::scaled_height;
use crate::variants::{ImageSource, ImageVariant, OneOrMany, Transformer};
use serde::Serialize;

/// Produces variants for a remote image from its seed alone.
pub trait UrlTransformer {
    fn transform_url(&self, seed: &str) -> OneOrMany<ImageVariant>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateTransformer {
    template: String,
    sizes: Vec<u32>,
    formats: Vec<Format>,
    width: u32,
    height: u32,
}

impl TemplateTransformer {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            template: config.template.clone(),
            sizes: config.sizes.clone(),
            formats: config.formats.clone(),
            width: config.width,
            height: config.height,
        }
    }

    /// Expand the template for one rendition.
    pub fn url(&self, seed: &str, format: Format, width: u32, height: u32) -> String {
        self.template
            .replace("{seed}", seed)
            .replace("{width}", &width.to_string())
            .replace("{height}", &height.to_string())
            .replace("{format}", format.name())
            .replace("{ext}", format.output_extension())
    }

    /// The untransformed image at its configured native size.
    pub fn source(&self, seed: &str) -> ImageSource {
        let format = self.formats.first().copied().unwrap_or(Format::Jpeg);
        ImageSource {
            source: self.url(seed, format, self.width, self.height),
            width: self.width,
            height: self.height,
            options: None,
        }
    }

    fn expand(&self, seed: &str, native: (u32, u32)) -> Vec<ImageVariant> {
        self.formats
            .iter()
            .flat_map(|&format| {
                self.sizes.iter().map(move |&size| {
                    let height = scaled_height(native, size);
                    ImageVariant::new(self.url(seed, format, size, height), size, format.mime())
                })
            })
            .collect()
    }
}

impl UrlTransformer for TemplateTransformer {
    fn transform_url(&self, seed: &str) -> OneOrMany<ImageVariant> {
        OneOrMany::Many(self.expand(seed, (self.width, self.height)))
    }
}

/// Treats `source.source` as the seed and keeps the source's aspect ratio.
impl<T> Transformer<T> for TemplateTransformer {
    fn transform(&self, source: &ImageSource<T>) -> OneOrMany<ImageVariant> {
        let native = if source.width > 0 && source.height > 0 {
            (source.width, source.height)
        } else {
            (self.width, self.height)
        };
        OneOrMany::Many(self.expand(&source.source, native))
    }
}

/// Everything a page needs to render one remote picture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteImage {
    pub src: ImageSource,
    pub variants: Vec<ImageVariant>,
}

pub fn remote_image(transformer: &TemplateTransformer, seed: &str) -> RemoteImage {
    RemoteImage {
        src: transformer.source(seed),
        variants: crate::variants::ensure_array(transformer.transform_url(seed)),
    }
}
