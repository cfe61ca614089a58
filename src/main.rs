use clap::{Parser, Subcommand};
use imitari::config::{self, ImitariConfig};
use imitari::imaging::RustBackend;
use imitari::output::{self, ImageReport};
use imitari::remote::{self, TemplateTransformer};
use imitari::resolver::Resolver;
use imitari::variants::picture_sources;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "imitari")]
#[command(version)]
#[command(about = "Build-time responsive images from import queries")]
#[command(long_about = "\
Build-time responsive images from import queries

An import of `./cat.png?imitari` resolves to a generated module exposing the
original's size and a transformer over every configured format and size.
Raw variants are written to <public_path>/.imitari/.

Directives:

  x.png?imitari                    entry: { src, transformer }
  x.png?imitari-source             { width, height, source }
  x.png?imitari-transformer        { transform() } over formats x sizes
  x.png?imitari-<format>-<size>    variant metadata
  x.png?imitari-raw-<format>-<size>  encoded asset URL

Run 'imitari gen-config' to generate a documented imitari.toml.")]
struct Cli {
    /// Project root: holds imitari.toml, relative specifiers resolve here
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Override the public path prefix for emitted URLs
    #[arg(long, global = true)]
    public_path: Option<String>,

    /// Override lossy encoding quality (0.0-1.0)
    #[arg(long, global = true)]
    quality: Option<f32>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the generated module for one import specifier
    Resolve {
        specifier: String,
        /// File that contains the import
        #[arg(long)]
        importer: Option<PathBuf>,
    },
    /// Materialize every variant of the given images or directories
    Build {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Worker threads (defaults to all cores)
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Print the variants of a remote image as JSON
    Remote { seed: String },
    /// Print a stock imitari.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Resolve {
            specifier,
            importer,
        } => {
            let resolver = Resolver::new(load_config(&cli)?, RustBackend::new(), &cli.root);
            let Some(id) = resolver.resolve_id(specifier, importer.as_deref()) else {
                output::print_resolve_output(specifier, None);
                return Ok(());
            };
            let module = resolver.load(&id)?;
            output::print_resolve_output(&id, module.as_deref());
        }
        Command::Build { paths, jobs } => {
            init_thread_pool(*jobs);
            let resolver = Resolver::new(load_config(&cli)?, RustBackend::new(), &cli.root);
            let images = collect_images(&resolver, &cli.root, paths);
            let reports: Vec<ImageReport> = images
                .par_iter()
                .map(|path| build_image(&resolver, path))
                .collect();
            output::print_build_output(&reports, &resolver.stats());
            if reports.iter().any(|r| r.outcome.is_err()) {
                return Err("some images failed to build".into());
            }
        }
        Command::Remote { seed } => {
            let config = load_config(&cli)?;
            let remote = config
                .remote
                .as_ref()
                .ok_or("no [remote] section in imitari.toml")?;
            let transformer = TemplateTransformer::new(remote);
            output::print_remote_output(&remote::remote_image(&transformer, seed))?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon global pool; `None` keeps rayon's default.
fn init_thread_pool(jobs: Option<usize>) {
    if let Some(threads) = jobs {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .build_global()
        {
            tracing::warn!("could not configure {} worker threads: {}", threads, e);
        }
    }
}

fn load_config(cli: &Cli) -> Result<ImitariConfig, config::ConfigError> {
    let mut overrides = toml::map::Map::new();
    if let Some(public_path) = &cli.public_path {
        overrides.insert(
            "public_path".into(),
            toml::Value::String(public_path.clone()),
        );
    }
    if let Some(quality) = cli.quality {
        overrides.insert("quality".into(), toml::Value::Float(quality.into()));
    }
    let overrides = (!overrides.is_empty()).then_some(toml::Value::Table(overrides));
    config::load_config(&cli.root, overrides)
}

/// Expand files and directories into accepted images, relative to `root`.
///
/// Sorted and free of duplicates even when the arguments overlap.
fn collect_images(resolver: &Resolver<RustBackend>, root: &Path, paths: &[PathBuf]) -> Vec<PathBuf> {
    let output_dir = root.join(resolver.config().public_path.trim_start_matches('/'));
    let mut images = BTreeSet::new();
    for path in paths {
        let full = root.join(path);
        for entry in WalkDir::new(&full).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.starts_with(&output_dir)
                || !resolver.accepts(path)
            {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path);
            images.insert(relative.to_path_buf());
        }
    }
    images.into_iter().collect()
}

fn build_image(resolver: &Resolver<RustBackend>, path: &Path) -> ImageReport {
    let source = path.display().to_string();
    let dimensions = resolver
        .source_metadata(path)
        .ok()
        .map(|s| (s.width, s.height));
    let outcome = resolver
        .variants(path)
        .map_err(|e| e.to_string())
        .and_then(|variants| picture_sources(&variants).map_err(|e| e.to_string()));
    if let Err(message) = &outcome {
        tracing::warn!(%source, "build failed: {}", message);
    }
    ImageReport {
        source,
        dimensions,
        outcome,
    }
}
