//! Centralized naming for generated assets.
//!
//! Every generated file follows one pattern:
//!
//! ```text
//! <public_path>/.imitari/imitari-<hash>-<size>.<ext>
//! ```
//!
//! - `hash` is the first 16 hex digits of SHA-256 over the source's
//!   [path key](path_key), so it depends only on where the image lives in
//!   the project, not on its bytes or on how the build was invoked.
//! - `size` is the target width in pixels.
//! - `ext` is the canonical [output extension](Format::output_extension).
//!
//! Distinct `(path, format, size)` triples never share a name: formats have
//! distinct output extensions and the size is spelled out.

use crate::format::Format;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};

/// Directory under the public path that holds all generated assets.
pub const ASSET_DIR: &str = ".imitari";

/// Prefix of every generated file name.
pub const ASSET_PREFIX: &str = "imitari";

/// Stable, `/`-separated key for a source path.
///
/// The path is made relative to `root` when it lives under it, and `.` / `..`
/// components are folded lexically, so `./img/a.png`, `img/../img/a.png` and
/// `<root>/img/a.png` all produce `img/a.png` regardless of the working
/// directory or platform separator.
pub fn path_key(root: &Path, path: &Path) -> String {
    let root = normalize_components(root);
    let path = normalize_components(path);
    if !root.is_empty() && path.starts_with(&root) {
        return path[root.len()..].join("/");
    }
    path.join("/")
}

fn normalize_components(path: &Path) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last().map(String::as_str) {
                // `..` at the filesystem root stays at the root
                Some("") => {}
                Some("..") | None => parts.push("..".to_string()),
                Some(_) => {
                    parts.pop();
                }
            },
            Component::RootDir => parts.push(String::new()),
            Component::Prefix(p) => parts.push(p.as_os_str().to_string_lossy().into_owned()),
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
        }
    }
    parts
}

/// Hash of a path key, 16 lowercase hex digits.
pub fn hash_path_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// File name of one generated asset: `imitari-<hash>-<size>.<ext>`.
pub fn asset_file_name(hash: &str, size: u32, format: Format) -> String {
    format!(
        "{}-{}-{}.{}",
        ASSET_PREFIX,
        hash,
        size,
        format.output_extension()
    )
}

/// Public URL of an asset: `<public_path>/.imitari/<file_name>`.
pub fn public_url(public_path: &str, file_name: &str) -> String {
    let prefix = public_path.trim_end_matches('/');
    if prefix.is_empty() {
        let root = if public_path.starts_with('/') { "/" } else { "" };
        format!("{}{}/{}", root, ASSET_DIR, file_name)
    } else {
        format!("{}/{}/{}", prefix, ASSET_DIR, file_name)
    }
}

/// On-disk location of an asset: `<root>/<public_path>/.imitari/<file_name>`.
///
/// A leading `/` on the public path is a URL root, not a filesystem root.
pub fn asset_path(root: &Path, public_path: &str, file_name: &str) -> PathBuf {
    root.join(public_path.trim_start_matches('/'))
        .join(ASSET_DIR)
        .join(file_name)
}
