//! Project configuration.
//!
//! Handles loading, layering and validating `imitari.toml`. Stock defaults
//! are the base layer, the project file is merged on top, and CLI overrides
//! are merged last.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! sizes = [480, 800, 1200]         # Pixel widths to generate
//! input = ["png", "jpeg", "webp"]  # Formats accepted as sources
//! output = ["png", "jpeg", "webp"] # Formats generated for each size
//! quality = 0.8                    # Lossy encoding quality (0.0-1.0)
//! public_path = "dist"             # Prefix for emitted URLs
//!
//! [remote]                         # Optional, URL templating for remote images
//! template = "https://img.example.com/{seed}?w={width}&fm={format}"
//! sizes = [400, 800]
//! formats = ["webp", "jpeg"]
//! width = 1200                     # Native size reported for remote sources
//! height = 800
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::format::Format;
use crate::imaging::Quality;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the project config file.
pub const CONFIG_FILENAME: &str = "imitari.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Image pipeline configuration loaded from `imitari.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImitariConfig {
    /// Pixel widths to generate for every output format.
    pub sizes: Vec<u32>,
    /// Source formats the resolver accepts; other files pass through.
    pub input: Vec<Format>,
    /// Formats generated for each size, in transformer order.
    pub output: Vec<Format>,
    /// Lossy encoding quality as a fraction (0.0 = worst, 1.0 = best).
    pub quality: f32,
    /// Prefix for emitted URLs and output directory under the project root.
    pub public_path: String,
    /// URL templating for remote images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
}

impl Default for ImitariConfig {
    fn default() -> Self {
        Self {
            sizes: vec![480, 800, 1200],
            input: default_formats(),
            output: default_formats(),
            quality: 0.8,
            public_path: "dist".to_string(),
            remote: None,
        }
    }
}

fn default_formats() -> Vec<Format> {
    vec![Format::Png, Format::Jpeg, Format::Webp]
}

impl ImitariConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(ConfigError::Validation(
                "quality must be between 0.0 and 1.0".into(),
            ));
        }
        if self.sizes.is_empty() {
            return Err(ConfigError::Validation("sizes must not be empty".into()));
        }
        if self.sizes.contains(&0) {
            return Err(ConfigError::Validation("sizes must be positive".into()));
        }
        if self.input.is_empty() {
            return Err(ConfigError::Validation("input must not be empty".into()));
        }
        if let Some(f) = self.input.iter().find(|f| !f.is_decodable()) {
            return Err(ConfigError::Validation(format!(
                "input format {f} cannot be decoded"
            )));
        }
        if self.output.is_empty() {
            return Err(ConfigError::Validation("output must not be empty".into()));
        }
        if self.public_path.is_empty() {
            return Err(ConfigError::Validation(
                "public_path must not be empty".into(),
            ));
        }
        if let Some(remote) = &self.remote {
            remote.validate()?;
        }
        Ok(())
    }
}

/// Remote image templating settings.
///
/// Placeholders: `{seed}`, `{width}`, `{height}`, `{format}`, `{ext}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    pub template: String,
    pub sizes: Vec<u32>,
    pub formats: Vec<Format>,
    /// Native width reported for remote sources.
    pub width: u32,
    /// Native height reported for remote sources.
    pub height: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            template: String::new(),
            sizes: vec![400, 800],
            formats: vec![Format::Webp, Format::Jpeg],
            width: 1200,
            height: 800,
        }
    }
}

impl RemoteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.template.contains("{seed}") {
            return Err(ConfigError::Validation(
                "remote.template must contain {seed}".into(),
            ));
        }
        if self.sizes.is_empty() || self.sizes.contains(&0) {
            return Err(ConfigError::Validation(
                "remote.sizes must be non-empty and positive".into(),
            ));
        }
        if self.formats.is_empty() {
            return Err(ConfigError::Validation(
                "remote.formats must not be empty".into(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Validation(
                "remote.width and remote.height must be positive".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ImitariConfig::default()).unwrap_or_else(|_| {
        toml::Value::Table(toml::map::Map::new())
    })
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `imitari.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays in order onto `base`, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<ImitariConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: ImitariConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `imitari.toml` in `root`, with optional CLI overrides.
pub fn load_config(
    root: &Path,
    overrides: Option<toml::Value>,
) -> Result<ImitariConfig, ConfigError> {
    let base = stock_defaults_value();
    let file = load_raw_config(root)?;
    resolve_config(base, file.into_iter().chain(overrides))
}

/// Returns a fully-commented stock `imitari.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Imitari Configuration
# =====================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Pixel widths to generate. Every output format is produced at every size.
sizes = [480, 800, 1200]

# Source formats handled by the resolver. Imports of other files pass
# through untouched. Choices: gif, jpeg, png, tiff, webp.
input = ["png", "jpeg", "webp"]

# Formats generated for each size, in the order the transformer lists them.
# Choices: avif, gif, jpeg, png, tiff, webp.
output = ["png", "jpeg", "webp"]

# Lossy encoding quality as a fraction (0.0 = worst, 1.0 = best).
# Applies to jpeg and avif; the other encoders are lossless.
quality = 0.8

# Prefix for emitted URLs. Assets are written to <public_path>/.imitari/.
public_path = "dist"

# ---------------------------------------------------------------------------
# Remote images (optional)
# ---------------------------------------------------------------------------
# Variants for remote images are pure URL templates; nothing is downloaded.
# Placeholders: {seed}, {width}, {height}, {format}, {ext}
#
# [remote]
# template = "https://img.example.com/{seed}?w={width}&fm={format}"
# sizes = [400, 800]
# formats = ["webp", "jpeg"]
# width = 1200
# height = 800
"##
}
