//! # Imitari
//!
//! Build-time responsive images driven by import queries. An import like
//! `./cat.png?imitari` resolves to a generated module that exports the
//! original's native size and a transformer listing every configured
//! `(format, size)` variant. Only the leaf `?imitari-raw-<format>-<size>`
//! modules decode, resize and encode pixels; everything above them is text.
//!
//! # Architecture
//!
//! ```text
//! specifier ──► directive ──► resolver ──► imaging ──► cache ──► URL
//!                              │                                  │
//!                              └────── generated module text ◄────┘
//!
//! runtime: [ImageVariant] ──► variants::merge_by_type ──► <source srcset>
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`format`] | Closed registry of formats, MIME types and input extensions |
//! | [`directive`] | Strict parser for the `?imitari[-kind[-arg]...]` query grammar |
//! | [`resolver`] | Declines or answers import ids with generated module text |
//! | [`imaging`] | Pure-Rust decode, Lanczos3 resize and encode behind [`imaging::ImageBackend`] |
//! | [`naming`] | Path keys, SHA-256 path hashes, asset file names and URLs |
//! | [`cache`] | Per-build coalescing writer: one transform per `(path, format, size)` |
//! | [`variants`] | Pure variant algebra: grouping by type, `srcset` strings |
//! | [`remote`] | Template-built variant URLs for remote images |
//! | [`config`] | `imitari.toml` loading, layering and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Lazy Raster Work
//!
//! The transformer module imports one metadata module per variant, and each
//! metadata module imports its raw module. A bundler that tree-shakes or
//! deduplicates the import graph therefore decides how much encoding
//! happens, and shared images are encoded once no matter how many pages use
//! them.
//!
//! ## Path-Keyed Asset Names
//!
//! Asset names hash the source's project-relative path, not its bytes. Names
//! are stable across machines and checkouts, and the cache can compute a
//! URL before any pixels exist. A changed image keeps its URL; cache busting
//! belongs to the deploy layer.

pub mod cache;
pub mod config;
pub mod directive;
pub mod format;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod remote;
pub mod resolver;
pub mod variants;

#[cfg(test)]
pub(crate) mod test_helpers;
