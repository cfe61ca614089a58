//! Format registry: static tables between MIME types, canonical formats and
//! file extensions.
//!
//! Every [`Format`] has exactly one [`Mime`], one canonical output extension
//! and at least one accepted input extension:
//!
//! | Format | MIME | Input extensions | Output |
//! |---|---|---|---|
//! | `avif` | `image/avif` | `avif` | `avif` |
//! | `gif` | `image/gif` | `gif` | `gif` |
//! | `jpeg` | `image/jpeg` | `jfif`, `jpeg`, `jpg`, `pjp`, `pjpeg` | `jpg` |
//! | `png` | `image/png` | `png` | `png` |
//! | `tiff` | `image/tiff` | `tif`, `tiff` | `tiff` |
//! | `webp` | `image/webp` | `webp` | `webp` |
//!
//! Extensions are many-to-one and only used when resolving *input* files.
//! Generated assets always use [`Format::output_extension`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Avif,
    Gif,
    Jpeg,
    Png,
    Tiff,
    Webp,
}

/// MIME type of a [`Format`]. 1:1 with `Format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mime {
    #[serde(rename = "image/avif")]
    Avif,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/tiff")]
    Tiff,
    #[serde(rename = "image/webp")]
    Webp,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Avif,
        Format::Gif,
        Format::Jpeg,
        Format::Png,
        Format::Tiff,
        Format::Webp,
    ];

    /// Canonical lowercase name, as used in directives (`imitari-png-400`).
    pub fn name(self) -> &'static str {
        match self {
            Format::Avif => "avif",
            Format::Gif => "gif",
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Tiff => "tiff",
            Format::Webp => "webp",
        }
    }

    pub fn mime(self) -> Mime {
        match self {
            Format::Avif => Mime::Avif,
            Format::Gif => Mime::Gif,
            Format::Jpeg => Mime::Jpeg,
            Format::Png => Mime::Png,
            Format::Tiff => Mime::Tiff,
            Format::Webp => Mime::Webp,
        }
    }

    /// Accepted input extensions, lowercase and without the dot.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Format::Avif => &["avif"],
            Format::Gif => &["gif"],
            Format::Jpeg => &["jfif", "jpeg", "jpg", "pjp", "pjpeg"],
            Format::Png => &["png"],
            Format::Tiff => &["tif", "tiff"],
            Format::Webp => &["webp"],
        }
    }

    /// The single extension used when naming generated assets.
    pub fn output_extension(self) -> &'static str {
        match self {
            Format::Jpeg => "jpg",
            other => other.name(),
        }
    }

    /// Look up the format an input extension belongs to (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Format> {
        let ext = ext.to_ascii_lowercase();
        Format::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }

    /// Matching `image` crate format, for decoding and encoding.
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Format::Avif => image::ImageFormat::Avif,
            Format::Gif => image::ImageFormat::Gif,
            Format::Jpeg => image::ImageFormat::Jpeg,
            Format::Png => image::ImageFormat::Png,
            Format::Tiff => image::ImageFormat::Tiff,
            Format::Webp => image::ImageFormat::WebP,
        }
    }

    /// Whether the compiled backend can decode this format.
    ///
    /// The `image` crate's `avif` feature only enables the encoder, so AVIF
    /// is valid as an output but never as an input.
    pub fn is_decodable(self) -> bool {
        !matches!(self, Format::Avif)
    }
}

impl Mime {
    pub fn as_str(self) -> &'static str {
        match self {
            Mime::Avif => "image/avif",
            Mime::Gif => "image/gif",
            Mime::Jpeg => "image/jpeg",
            Mime::Png => "image/png",
            Mime::Tiff => "image/tiff",
            Mime::Webp => "image/webp",
        }
    }

    pub fn format(self) -> Format {
        match self {
            Mime::Avif => Format::Avif,
            Mime::Gif => Format::Gif,
            Mime::Jpeg => Format::Jpeg,
            Mime::Png => Format::Png,
            Mime::Tiff => Format::Tiff,
            Mime::Webp => Format::Webp,
        }
    }
}

/// True if `candidate` is an input extension of any format in `known`.
///
/// Callers check membership here before trusting [`Format::from_extension`]
/// for a configured input set.
pub fn is_valid_extension(known: &[Format], candidate: &str) -> bool {
    Format::from_extension(candidate).is_some_and(|f| known.contains(&f))
}

/// Error for a string outside the registry's closed domains.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    /// Parses a canonical format name (not an extension alias).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

impl FromStr for Mime {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .map(Format::mime)
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Mime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
