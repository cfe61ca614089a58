//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations) (which validates the
//! request) and the [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality as a 0–1 fraction (default 0.8). Clamped on construction.
//! - [`TransformParams`]: everything needed to produce one variant: source, input and target format, width, quality.

use crate::format::Format;
use std::path::PathBuf;

/// Quality setting for lossy image encoding, as a fraction in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quality(f32);

impl Quality {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality on the 1–100 scale the JPEG and AVIF encoders take.
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(0.8)
    }
}

/// Parameters for producing one variant.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    pub source: PathBuf,
    /// Encoding of `source`, inferred from its extension.
    pub input: Format,
    pub format: Format,
    /// Target width; height follows the source aspect ratio.
    pub width: u32,
    pub quality: Quality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(-0.5).value(), 0.0);
        assert_eq!(Quality::new(0.5).value(), 0.5);
        assert_eq!(Quality::new(80.0).value(), 1.0);
    }

    #[test]
    fn quality_default_is_point_eight() {
        assert_eq!(Quality::default().value(), 0.8);
        assert_eq!(Quality::default().percent(), 80);
    }

    #[test]
    fn quality_nan_falls_back_to_default() {
        assert_eq!(Quality::new(f32::NAN), Quality::default());
    }

    #[test]
    fn percent_never_zero() {
        assert_eq!(Quality::new(0.0).percent(), 1);
        assert_eq!(Quality::new(1.0).percent(), 100);
        assert_eq!(Quality::new(0.55).percent(), 55);
    }
}
