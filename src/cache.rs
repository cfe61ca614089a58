//! Per-build asset cache and output writer.
//!
//! Encoding is the bottleneck of the pipeline, and the same variant is
//! usually requested many times in one build (every importer of an image
//! pulls in the same `imitari-raw-*` modules). This module makes sure each
//! distinct `(path, format, size)` triple is transformed and written at most
//! once per build.
//!
//! # Design
//!
//! The cache is an explicit map from [`AssetKey`] to a slot holding the
//! public URL once the asset exists:
//!
//! ```text
//! slots: Mutex<HashMap<AssetKey, Arc<Mutex<Option<String>>>>>
//! ```
//!
//! - The outer lock is held only long enough to fetch or create a slot.
//! - The slot lock is held across the transform and the write, so a
//!   concurrent request for the same triple waits for the first one and then
//!   reuses its URL instead of encoding again.
//! - Unrelated triples never contend beyond the brief outer lock.
//! - A failed attempt leaves the slot empty; the next request tries again.
//!
//! ## Naming
//!
//! File names come from [`naming`](crate::naming): a hash of the source's
//! path key plus the size and canonical extension, so keys and files map
//! 1:1 and a retried build overwrites only files with the same key.
//!
//! ## Scope
//!
//! A `BuildCache` lives for one build. Nothing is persisted besides the
//! assets themselves; a new build starts empty and re-encodes.

use crate::format::Format;
use crate::imaging::BackendError;
use crate::naming;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Render(#[from] BackendError),
    #[error("Failed to write {}: {}", path.display(), source)]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Identity of one generated asset within a build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey {
    /// Stable source key from [`naming::path_key`].
    pub path_key: String,
    pub format: Format,
    pub size: u32,
}

impl AssetKey {
    pub fn new(path_key: impl Into<String>, format: Format, size: u32) -> Self {
        Self {
            path_key: path_key.into(),
            format,
            size,
        }
    }

    /// `imitari-<hash>-<size>.<ext>`
    pub fn file_name(&self) -> String {
        naming::asset_file_name(&naming::hash_path_key(&self.path_key), self.size, self.format)
    }
}

type Slot = Arc<Mutex<Option<String>>>;

/// Coalescing asset cache for one build run.
pub struct BuildCache {
    root: PathBuf,
    public_path: String,
    slots: Mutex<HashMap<AssetKey, Slot>>,
    encoded: AtomicU32,
    reused: AtomicU32,
    failed: AtomicU32,
}

impl BuildCache {
    /// Assets are written under `<root>/<public_path>/.imitari/`.
    pub fn new(root: impl Into<PathBuf>, public_path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_path: public_path.into(),
            slots: Mutex::new(HashMap::new()),
            encoded: AtomicU32::new(0),
            reused: AtomicU32::new(0),
            failed: AtomicU32::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL an asset has (or will have) for this build.
    pub fn public_url(&self, key: &AssetKey) -> String {
        naming::public_url(&self.public_path, &key.file_name())
    }

    /// On-disk location of an asset.
    pub fn output_path(&self, key: &AssetKey) -> PathBuf {
        naming::asset_path(&self.root, &self.public_path, &key.file_name())
    }

    /// Return the URL for `key`, running `render` and writing its bytes only
    /// if this build has not produced the asset yet.
    ///
    /// Concurrent calls for the same key run `render` once; the others block
    /// until it finishes and get the same URL.
    pub fn materialize<F>(&self, key: &AssetKey, render: F) -> Result<String, CacheError>
    where
        F: FnOnce() -> Result<Vec<u8>, BackendError>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(url) = guard.as_ref() {
            self.reused.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(%url, "reusing generated asset");
            return Ok(url.clone());
        }

        match self.render_and_write(key, render) {
            Ok(url) => {
                self.encoded.fetch_add(1, Ordering::Relaxed);
                *guard = Some(url.clone());
                Ok(url)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    fn render_and_write<F>(&self, key: &AssetKey, render: F) -> Result<String, CacheError>
    where
        F: FnOnce() -> Result<Vec<u8>, BackendError>,
    {
        let bytes = render()?;
        let path = self.output_path(key);
        write_asset(&path, &bytes)?;
        let url = self.public_url(key);
        tracing::info!(%url, bytes = bytes.len(), "wrote generated asset");
        Ok(url)
    }

    fn slot(&self, key: &AssetKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.clone()).or_default().clone()
    }

    /// Whether this build already produced `key`.
    pub fn contains(&self, key: &AssetKey) -> bool {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            match slots.get(key) {
                Some(slot) => slot.clone(),
                None => return false,
            }
        };
        let materialized = slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        materialized
    }

    /// Snapshot of the counters so far.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            encoded: self.encoded.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

fn write_asset(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let failure = |source| CacheError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(failure)?;
    }
    std::fs::write(path, bytes).map_err(failure)
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub encoded: u32,
    pub reused: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.encoded + self.reused + self.failed
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reused > 0 {
            write!(f, "{} reused, {} encoded", self.reused, self.encoded)?;
        } else {
            write!(f, "{} encoded", self.encoded)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.reused > 0 || self.failed > 0 {
            write!(f, " ({} total)", self.total())?;
        }
        Ok(())
    }
}
