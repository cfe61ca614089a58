//! Virtual module resolver for the `?imitari` directive protocol.
//!
//! A bundler hands the resolver an import id; the resolver either declines
//! (`None`) or returns the source text of a small generated module.
//!
//! ```text
//! x.png?imitari                 → { src, transformer }
//!   x.png?imitari-source        → { width, height, source }     (identify only)
//!   x.png?imitari-transformer   → { transform() → [variant...] }
//!     x.png?imitari-png-400     → { width: 400, type, path }
//!       x.png?imitari-raw-png-400 → "<public url>"               (transform + write)
//! ```
//!
//! Only the raw module touches pixels. Everything above it is pure text
//! generation, so importing a picture pulls in raster work lazily through
//! the import graph and each raw module is shared by every importer.
//!
//! Decline rules, checked in order:
//! 1. ids starting with `\0` belong to other plugins;
//! 2. ids without a `?imitari` query;
//! 3. real files whose extension is outside the configured `input` set;
//! 4. queries naming an unknown kind or format.

use crate::cache::{AssetKey, BuildCache, CacheError, CacheStats};
use crate::config::ImitariConfig;
use crate::directive::{self, DirectiveError, QUERY_KEYWORD, TransformDirective};
use crate::format::{self, Format};
use crate::imaging::{self, BackendError, ImageBackend};
use crate::naming;
use crate::variants::{ImageSource, ImageVariant};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Failed to write {}: {}", path.display(), source)]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    MalformedDirective(#[from] DirectiveError),
    #[error("Backend error: {0}")]
    Backend(BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BackendError> for ResolveError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::UnsupportedFormat(msg) => ResolveError::UnsupportedFormat(msg),
            BackendError::Io(io) => ResolveError::Io(io),
            other => ResolveError::Backend(other),
        }
    }
}

impl From<CacheError> for ResolveError {
    fn from(e: CacheError) -> Self {
        match e {
            CacheError::Render(backend) => backend.into(),
            CacheError::WriteFailure { path, source } => ResolveError::WriteFailure { path, source },
        }
    }
}

/// Resolves and loads `?imitari` modules for one build.
pub struct Resolver<B: ImageBackend> {
    config: ImitariConfig,
    backend: B,
    cache: BuildCache,
}

impl<B: ImageBackend> Resolver<B> {
    /// Relative specifiers resolve against `root`; assets are written under
    /// `<root>/<public_path>/.imitari/`.
    pub fn new(config: ImitariConfig, backend: B, root: impl Into<PathBuf>) -> Self {
        let cache = BuildCache::new(root, config.public_path.clone());
        Self {
            config,
            backend,
            cache,
        }
    }

    pub fn config(&self) -> &ImitariConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.cache.root()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Whether `path` has an extension in the configured input set.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| format::is_valid_extension(&self.config.input, ext))
    }

    /// Claim `id` if it carries an imitari query on an accepted file.
    ///
    /// The returned id is what [`load`](Self::load) expects: root-relative
    /// or absolute. Relative paths are joined to the importer's directory,
    /// then made root-relative when they land under the root. Absolute ids
    /// and ids without an importer come back unchanged.
    pub fn resolve_id(&self, id: &str, importer: Option<&Path>) -> Option<String> {
        if id.starts_with('\0') {
            return None;
        }
        let (path, query) = id.split_once('?')?;
        if query.split('-').next() != Some(QUERY_KEYWORD) || !self.accepts(Path::new(path)) {
            return None;
        }
        let Some(dir) = importer.and_then(Path::parent) else {
            return Some(id.to_string());
        };
        if Path::new(path).is_absolute() {
            return Some(id.to_string());
        }
        let joined = dir.join(path);
        let rooted = joined.strip_prefix(self.root()).unwrap_or(&joined);
        Some(format!("{}?{}", rooted.display(), query))
    }

    /// Generated module text for `id`, or `None` when the id is not ours.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn load(&self, id: &str) -> Result<Option<String>, ResolveError> {
        if id.starts_with('\0') {
            return Ok(None);
        }
        let Some((path, _)) = id.split_once('?') else {
            return Ok(None);
        };
        if !self.accepts(Path::new(path)) {
            return Ok(None);
        }
        let Some(spec) = directive::parse_specifier(id)? else {
            tracing::debug!("declining unrecognized directive");
            return Ok(None);
        };

        let file = self.root().join(spec.path);
        let import = relative_import(&file);

        let text = match spec.directive {
            TransformDirective::Entry => entry_module(&import),
            TransformDirective::Source => {
                let (width, height) = imaging::get_dimensions(&self.backend, &file)?;
                source_module(&import, width, height)
            }
            TransformDirective::Transformer => transformer_module(&import, &self.plan_variants()),
            TransformDirective::Image { format, size } => image_module(&import, format, size),
            TransformDirective::Raw { format, size } => {
                raw_module(&self.materialize(&file, format, size)?)
            }
        };
        Ok(Some(text))
    }

    /// Every configured `(format, size)` pair: formats outer, sizes inner.
    pub fn plan_variants(&self) -> Vec<(Format, u32)> {
        self.config
            .output
            .iter()
            .flat_map(|&format| self.config.sizes.iter().map(move |&size| (format, size)))
            .collect()
    }

    /// Transform and write one variant, returning its public URL.
    pub fn materialize(&self, file: &Path, format: Format, size: u32) -> Result<String, ResolveError> {
        let key = AssetKey::new(naming::path_key(self.root(), file), format, size);
        let quality = self.config.quality();
        let url = self.cache.materialize(&key, || {
            imaging::transform(&self.backend, file, format, size, quality)
        })?;
        Ok(url)
    }

    /// Materialize every planned variant of `path` in parallel.
    ///
    /// The result is in transformer order regardless of completion order.
    pub fn variants(&self, path: &Path) -> Result<Vec<ImageVariant>, ResolveError> {
        if !self.accepts(path) {
            return Err(ResolveError::UnsupportedFormat(format!(
                "not a configured input: {}",
                path.display()
            )));
        }
        let file = self.root().join(path);
        self.plan_variants()
            .par_iter()
            .map(|&(format, size)| -> Result<ImageVariant, ResolveError> {
                let url = self.materialize(&file, format, size)?;
                Ok(ImageVariant::new(url, size, format.mime()))
            })
            .collect()
    }

    /// Native dimensions of `path`, without any raster transform.
    pub fn source_metadata(&self, path: &Path) -> Result<ImageSource, ResolveError> {
        if !self.accepts(path) {
            return Err(ResolveError::UnsupportedFormat(format!(
                "not a configured input: {}",
                path.display()
            )));
        }
        let file = self.root().join(path);
        let (width, height) = imaging::get_dimensions(&self.backend, &file)?;
        Ok(ImageSource {
            source: path.to_string_lossy().into_owned(),
            width,
            height,
            options: None,
        })
    }
}

// =============================================================================
// Generated module text
// =============================================================================

fn relative_import(file: &Path) -> String {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("./{}", name)
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn with_directive(import: &str, directive: TransformDirective) -> String {
    js_string(&format!("{}?{}", import, directive))
}

fn entry_module(import: &str) -> String {
    format!(
        "import src from {};\n\
         import transformer from {};\n\
         export {{ src, transformer }};\n\
         export default {{ src, transformer }};\n",
        with_directive(import, TransformDirective::Source),
        with_directive(import, TransformDirective::Transformer),
    )
}

fn source_module(import: &str, width: u32, height: u32) -> String {
    format!(
        "import source from {};\n\
         export const width = {};\n\
         export const height = {};\n\
         export {{ source }};\n\
         export default {{ width, height, source }};\n",
        js_string(import),
        width,
        height,
    )
}

fn transformer_module(import: &str, plan: &[(Format, u32)]) -> String {
    let mut text = String::new();
    for (i, &(format, size)) in plan.iter().enumerate() {
        text.push_str(&format!(
            "import v{} from {};\n",
            i,
            with_directive(import, TransformDirective::Image { format, size })
        ));
    }
    let names: Vec<String> = (0..plan.len()).map(|i| format!("v{}", i)).collect();
    text.push_str(&format!(
        "export default {{ transform() {{ return [{}]; }} }};\n",
        names.join(", ")
    ));
    text
}

fn image_module(import: &str, format: Format, size: u32) -> String {
    format!(
        "import path from {};\n\
         export default {{ width: {}, type: {}, path }};\n",
        with_directive(import, TransformDirective::Raw { format, size }),
        size,
        js_string(format.mime().as_str()),
    )
}

fn raw_module(url: &str) -> String {
    format!("export default {};\n", js_string(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use tempfile::TempDir;

    fn config(sizes: &[u32], output: &[Format]) -> ImitariConfig {
        ImitariConfig {
            sizes: sizes.to_vec(),
            output: output.to_vec(),
            ..ImitariConfig::default()
        }
    }

    fn resolver(tmp: &TempDir, backend: MockBackend) -> Resolver<MockBackend> {
        Resolver::new(
            config(&[400, 800], &[Format::Png, Format::Jpeg]),
            backend,
            tmp.path(),
        )
    }

    // =========================================================================
    // Declining
    // =========================================================================

    #[test]
    fn declines_ids_without_query() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        assert_eq!(r.load("img/x.png").unwrap(), None);
        assert_eq!(r.resolve_id("img/x.png", None), None);
    }

    #[test]
    fn declines_foreign_queries() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        assert_eq!(r.load("img/x.png?url").unwrap(), None);
        assert_eq!(r.load("img/x.png?imitari-bogus").unwrap(), None);
        assert_eq!(r.resolve_id("img/x.png?raw", None), None);
    }

    #[test]
    fn declines_virtual_ids() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        assert_eq!(r.load("\0x.png?imitari").unwrap(), None);
        assert_eq!(r.resolve_id("\0x.png?imitari", None), None);
    }

    #[test]
    fn declines_inputs_outside_configured_set() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::with_dimensions(10, 10);
        let r = resolver(&tmp, backend);
        assert_eq!(r.load("path/to/x.gif?imitari").unwrap(), None);
        // even a malformed size is not ours when the extension isn't
        assert_eq!(r.load("path/to/x.gif?imitari-png-0").unwrap(), None);
        assert!(r.backend.get_operations().is_empty());
    }

    #[test]
    fn malformed_size_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        assert!(matches!(
            r.load("x.png?imitari-raw-png-0"),
            Err(ResolveError::MalformedDirective(_))
        ));
        assert!(matches!(
            r.load("x.png?imitari-png-abc"),
            Err(ResolveError::MalformedDirective(_))
        ));
    }

    // =========================================================================
    // resolve_id
    // =========================================================================

    #[test]
    fn resolve_id_joins_importer_directory() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        let resolved = r
            .resolve_id("./cat.jpg?imitari", Some(Path::new("/app/src/page.tsx")))
            .unwrap();
        assert_eq!(resolved, "/app/src/./cat.jpg?imitari");
    }

    #[test]
    fn resolve_id_keeps_absolute_ids() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        assert_eq!(
            r.resolve_id("/abs/cat.webp?imitari-source", Some(Path::new("/app/a.ts"))),
            Some("/abs/cat.webp?imitari-source".to_string())
        );
    }

    #[test]
    fn resolve_id_without_importer_stays_root_relative() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        assert_eq!(
            r.resolve_id("img/cat.png?imitari", None),
            Some("img/cat.png?imitari".to_string())
        );
    }

    #[test]
    fn resolve_id_under_root_is_made_root_relative() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        let importer = tmp.path().join("src/page.tsx");
        assert_eq!(
            r.resolve_id("img/cat.png?imitari-source", Some(&importer)),
            Some("src/img/cat.png?imitari-source".to_string())
        );
    }

    #[test]
    fn resolved_ids_load_against_a_relative_root() {
        let tmp = TempDir::new_in(".").unwrap();
        // tempfile hands back an absolute path; the resolver gets it relative
        let cwd = std::env::current_dir().unwrap();
        let root = tmp.path().strip_prefix(&cwd).unwrap().to_path_buf();
        assert!(root.is_relative());
        let r = Resolver::new(config(&[400], &[Format::Png]), MockBackend::new(), &root);

        let id = r.resolve_id("cat.jpg?imitari-raw-png-400", None).unwrap();
        r.load(&id).unwrap().unwrap();

        let importer = root.join("pages/index.ts");
        let nested = r
            .resolve_id("./dog.jpg?imitari-raw-png-400", Some(&importer))
            .unwrap();
        assert_eq!(nested, "pages/./dog.jpg?imitari-raw-png-400");
        r.load(&nested).unwrap().unwrap();

        let sources: Vec<String> = r
            .backend
            .get_operations()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Transform { source, .. } => Some(source),
                _ => None,
            })
            .collect();
        assert_eq!(
            sources,
            [
                root.join("cat.jpg").to_string_lossy().to_string(),
                root.join("pages/./dog.jpg").to_string_lossy().to_string(),
            ]
        );
        assert!(r.cache.contains(&AssetKey::new("cat.jpg", Format::Png, 400)));
        assert!(r.cache.contains(&AssetKey::new("pages/dog.jpg", Format::Png, 400)));
    }

    // =========================================================================
    // Generated modules
    // =========================================================================

    #[test]
    fn entry_module_reexports_source_and_transformer() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        let text = r.load("img/x.png?imitari").unwrap().unwrap();
        assert_eq!(
            text,
            "import src from \"./x.png?imitari-source\";\n\
             import transformer from \"./x.png?imitari-transformer\";\n\
             export { src, transformer };\n\
             export default { src, transformer };\n"
        );
    }

    #[test]
    fn source_module_probes_dimensions_only() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::with_dimensions(1024, 768));
        let text = r.load("img/x.png?imitari-source").unwrap().unwrap();
        assert!(text.contains("import source from \"./x.png\";"));
        assert!(text.contains("export const width = 1024;"));
        assert!(text.contains("export const height = 768;"));
        assert_eq!(r.backend.transform_count(), 0);
    }

    #[test]
    fn transformer_is_formats_outer_sizes_inner() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        let text = r.load("path/to/x.png?imitari-transformer").unwrap().unwrap();
        let imports: Vec<&str> = text.lines().filter(|l| l.starts_with("import")).collect();
        assert_eq!(
            imports,
            [
                "import v0 from \"./x.png?imitari-png-400\";",
                "import v1 from \"./x.png?imitari-png-800\";",
                "import v2 from \"./x.png?imitari-jpeg-400\";",
                "import v3 from \"./x.png?imitari-jpeg-800\";",
            ]
        );
        assert!(text.contains("return [v0, v1, v2, v3];"));
        assert_eq!(r.backend.transform_count(), 0);
    }

    #[test]
    fn image_module_delegates_to_raw() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        let text = r.load("x.png?imitari-webp-800").unwrap().unwrap();
        assert_eq!(
            text,
            "import path from \"./x.png?imitari-raw-webp-800\";\n\
             export default { width: 800, type: \"image/webp\", path };\n"
        );
        assert_eq!(r.backend.transform_count(), 0);
    }

    #[test]
    fn raw_module_exports_url_and_writes_asset() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        let text = r.load("img/x.png?imitari-raw-jpeg-400").unwrap().unwrap();

        let key = AssetKey::new("img/x.png", Format::Jpeg, 400);
        let url = r.cache.public_url(&key);
        assert_eq!(text, format!("export default \"{}\";\n", url));
        assert_eq!(
            std::fs::read(r.cache.output_path(&key)).unwrap(),
            b"jpeg:400"
        );
        assert_eq!(
            r.backend.get_operations(),
            vec![RecordedOp::Transform {
                source: tmp.path().join("img/x.png").to_string_lossy().to_string(),
                input: Format::Png,
                format: Format::Jpeg,
                width: 400,
                quality: 0.8,
            }]
        );
    }

    #[test]
    fn repeated_raw_loads_transform_once() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        let first = r.load("x.png?imitari-raw-png-400").unwrap();
        let second = r.load("x.png?imitari-raw-png-400").unwrap();
        assert_eq!(first, second);
        assert_eq!(r.backend.transform_count(), 1);
        assert_eq!(r.stats().reused, 1);
    }

    #[test]
    fn loads_are_idempotent() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::with_dimensions(100, 50));
        for id in [
            "x.png?imitari",
            "x.png?imitari-source",
            "x.png?imitari-transformer",
            "x.png?imitari-png-400",
            "x.png?imitari-raw-png-400",
        ] {
            assert_eq!(r.load(id).unwrap(), r.load(id).unwrap(), "{id}");
        }
    }

    #[test]
    fn backend_failure_propagates() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::failing());
        assert!(matches!(
            r.load("x.png?imitari-raw-png-400"),
            Err(ResolveError::Backend(_))
        ));
    }

    #[test]
    fn write_failure_propagates() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("dist"), "not a dir").unwrap();
        let r = resolver(&tmp, MockBackend::new());
        assert!(matches!(
            r.load("x.png?imitari-raw-png-400"),
            Err(ResolveError::WriteFailure { .. })
        ));
    }

    // =========================================================================
    // Full evaluation
    // =========================================================================

    #[test]
    fn variants_follow_transformer_order() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        let variants = r.variants(Path::new("img/x.png")).unwrap();
        let shape: Vec<(u32, &str)> = variants
            .iter()
            .map(|v| (v.width, v.mime.as_str()))
            .collect();
        assert_eq!(
            shape,
            [
                (400, "image/png"),
                (800, "image/png"),
                (400, "image/jpeg"),
                (800, "image/jpeg"),
            ]
        );
        assert_eq!(r.backend.transform_count(), 4);
    }

    #[test]
    fn variants_share_cache_with_raw_loads() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        r.load("img/x.png?imitari-raw-png-400").unwrap();
        r.variants(Path::new("img/x.png")).unwrap();
        assert_eq!(r.backend.transform_count(), 4);
    }

    #[test]
    fn variants_reject_unaccepted_input() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::new());
        assert!(matches!(
            r.variants(Path::new("x.gif")),
            Err(ResolveError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn source_metadata_reports_native_size() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp, MockBackend::with_dimensions(640, 480));
        let source = r.source_metadata(Path::new("img/x.webp")).unwrap();
        assert_eq!(source.source, "img/x.webp");
        assert_eq!((source.width, source.height), (640, 480));
    }

    #[test]
    fn concurrent_loads_coalesce() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend {
            delay: Some(std::time::Duration::from_millis(20)),
            ..MockBackend::default()
        };
        let r = resolver(&tmp, backend);
        let outputs: Vec<Option<String>> = (0..8)
            .into_par_iter()
            .map(|_| r.load("x.png?imitari-raw-webp-800").unwrap())
            .collect();
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(r.backend.transform_count(), 1);
    }
}
