//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Diagnostics go through
//! `tracing` to stderr; only results are printed here.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! 001 img/cat.png (1200x900)
//!     <source type="image/webp" srcset="dist/.imitari/imitari-…-480.webp 480w,…">
//!     <source type="image/jpeg" srcset="dist/.imitari/imitari-…-480.jpg 480w,…">
//! 002 img/broken.png
//!     Failed: Backend error: Processing failed: …
//!
//! Built 1 image, 1 failed
//! Cache: 6 encoded
//! ```
//!
//! ## Resolve
//!
//! The generated module text verbatim, or `Declined: <id>`.

use crate::cache::CacheStats;
use crate::remote::RemoteImage;
use crate::variants::PictureSource;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// `<source type="..." srcset="...">`
pub fn source_element(source: &PictureSource) -> String {
    format!(
        "<source type=\"{}\" srcset=\"{}\">",
        source.mime, source.srcset
    )
}

// ============================================================================
// Build output
// ============================================================================

/// Result of building every variant of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    /// Path as given on the command line, relative to the root.
    pub source: String,
    pub dimensions: Option<(u32, u32)>,
    pub outcome: Result<Vec<PictureSource>, String>,
}

pub fn format_build_output(reports: &[ImageReport], stats: &CacheStats) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, report) in reports.iter().enumerate() {
        let header = match report.dimensions {
            Some((w, h)) => format!("{} {} ({}x{})", format_index(i + 1), report.source, w, h),
            None => format!("{} {}", format_index(i + 1), report.source),
        };
        lines.push(header);
        match &report.outcome {
            Ok(sources) => {
                for source in sources {
                    lines.push(format!("{}{}", indent(1), source_element(source)));
                }
            }
            Err(message) => lines.push(format!("{}Failed: {}", indent(1), message)),
        }
    }

    let failed = reports.iter().filter(|r| r.outcome.is_err()).count();
    let built = reports.len() - failed;
    if !reports.is_empty() {
        lines.push(String::new());
    }
    if failed > 0 {
        lines.push(format!("Built {}, {} failed", plural(built, "image"), failed));
    } else {
        lines.push(format!("Built {}", plural(built, "image")));
    }
    lines.push(format!("Cache: {}", stats));
    lines
}

pub fn print_build_output(reports: &[ImageReport], stats: &CacheStats) {
    for line in format_build_output(reports, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Resolve output
// ============================================================================

pub fn format_resolve_output(id: &str, module: Option<&str>) -> Vec<String> {
    match module {
        Some(text) => text.lines().map(str::to_string).collect(),
        None => vec![format!("Declined: {}", id)],
    }
}

pub fn print_resolve_output(id: &str, module: Option<&str>) {
    for line in format_resolve_output(id, module) {
        println!("{}", line);
    }
}

// ============================================================================
// Remote output
// ============================================================================

pub fn format_remote_output(image: &RemoteImage) -> Result<Vec<String>, serde_json::Error> {
    let json = serde_json::to_string_pretty(image)?;
    Ok(json.lines().map(str::to_string).collect())
}

pub fn print_remote_output(image: &RemoteImage) -> Result<(), serde_json::Error> {
    for line in format_remote_output(image)? {
        println!("{}", line);
    }
    Ok(())
}
