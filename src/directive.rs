//! Import-specifier directive grammar.
//!
//! ```text
//! <path>.<ext>?imitari                       → Entry
//! <path>.<ext>?imitari-source                → Source
//! <path>.<ext>?imitari-transformer           → Transformer
//! <path>.<ext>?imitari-raw-<format>-<size>   → Raw { format, size }
//! <path>.<ext>?imitari-<format>-<size>       → Image { format, size }
//! ```
//!
//! The query is split on `-` once and matched as a whole token list, so
//! `raw-png-400` can never be mistaken for a `<format>-<size>` directive
//! and vice versa.
//!
//! Outcomes of [`parse_specifier`]:
//! - `Ok(None)`: not ours (no `?imitari` query, or an unknown kind/format).
//! - `Err(DirectiveError::Malformed)`: a recognized kind whose size argument
//!   is missing, non-numeric, zero, or followed by extra arguments.
//! - `Ok(Some(..))`: a parsed [`Specifier`].

use crate::format::Format;
use std::fmt;
use thiserror::Error;

/// Query keyword every directive starts with.
pub const QUERY_KEYWORD: &str = "imitari";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("Malformed directive `{query}`: {reason}")]
    Malformed { query: String, reason: String },
}

/// A transform request parsed from an import query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformDirective {
    /// `{ src, transformer }` entry point.
    Entry,
    /// Native dimensions plus the original file.
    Source,
    /// `transform()` over every configured (format × size).
    Transformer,
    /// One rasterized variant; exports its public URL.
    Raw { format: Format, size: u32 },
    /// Variant descriptor delegating the URL to the raw module.
    Image { format: Format, size: u32 },
}

/// A specifier split into the real file and its directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier<'a> {
    pub path: &'a str,
    pub directive: TransformDirective,
}

/// Split `id` at its query and parse the directive, if any.
pub fn parse_specifier(id: &str) -> Result<Option<Specifier<'_>>, DirectiveError> {
    let Some((path, query)) = id.split_once('?') else {
        return Ok(None);
    };
    Ok(parse_query(query)?.map(|directive| Specifier { path, directive }))
}

/// Parse the query part of a specifier (everything after `?`).
pub fn parse_query(query: &str) -> Result<Option<TransformDirective>, DirectiveError> {
    let mut tokens = query.split('-');
    if tokens.next() != Some(QUERY_KEYWORD) {
        return Ok(None);
    }
    let rest: Vec<&str> = tokens.collect();

    let directive = match rest.as_slice() {
        [] => TransformDirective::Entry,
        ["source"] => TransformDirective::Source,
        ["transformer"] => TransformDirective::Transformer,
        ["raw", format, args @ ..] => match format.parse::<Format>() {
            Ok(format) => TransformDirective::Raw {
                format,
                size: parse_size(query, args)?,
            },
            Err(_) => return Ok(None),
        },
        [format, args @ ..] => match format.parse::<Format>() {
            Ok(format) => TransformDirective::Image {
                format,
                size: parse_size(query, args)?,
            },
            Err(_) => return Ok(None),
        },
    };
    Ok(Some(directive))
}

fn parse_size(query: &str, args: &[&str]) -> Result<u32, DirectiveError> {
    let malformed = |reason: &str| DirectiveError::Malformed {
        query: query.to_string(),
        reason: reason.to_string(),
    };
    let size = match args {
        [] => return Err(malformed("missing size")),
        [size] => size,
        _ => return Err(malformed("unexpected trailing arguments")),
    };
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("size must be an integer"));
    }
    match size.parse::<u32>() {
        Ok(0) => Err(malformed("size must be positive")),
        Ok(n) => Ok(n),
        Err(_) => Err(malformed("size out of range")),
    }
}

impl fmt::Display for TransformDirective {
    /// Renders the query form, e.g. `imitari-raw-png-400`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformDirective::Entry => write!(f, "{QUERY_KEYWORD}"),
            TransformDirective::Source => write!(f, "{QUERY_KEYWORD}-source"),
            TransformDirective::Transformer => write!(f, "{QUERY_KEYWORD}-transformer"),
            TransformDirective::Raw { format, size } => {
                write!(f, "{QUERY_KEYWORD}-raw-{format}-{size}")
            }
            TransformDirective::Image { format, size } => {
                write!(f, "{QUERY_KEYWORD}-{format}-{size}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> Option<TransformDirective> {
        parse_query(query).unwrap()
    }

    #[test]
    fn parses_every_kind() {
        assert_eq!(parse("imitari"), Some(TransformDirective::Entry));
        assert_eq!(parse("imitari-source"), Some(TransformDirective::Source));
        assert_eq!(
            parse("imitari-transformer"),
            Some(TransformDirective::Transformer)
        );
        assert_eq!(
            parse("imitari-raw-png-400"),
            Some(TransformDirective::Raw {
                format: Format::Png,
                size: 400
            })
        );
        assert_eq!(
            parse("imitari-webp-800"),
            Some(TransformDirective::Image {
                format: Format::Webp,
                size: 800
            })
        );
    }

    #[test]
    fn raw_prefix_does_not_collide_with_image() {
        // `raw` is not a format, so `raw-jpeg-400` is never read as a format directive
        assert!(matches!(
            parse("imitari-raw-jpeg-400"),
            Some(TransformDirective::Raw { .. })
        ));
        assert!(matches!(
            parse("imitari-jpeg-400"),
            Some(TransformDirective::Image { .. })
        ));
    }

    #[test]
    fn unrelated_queries_decline() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("url"), None);
        assert_eq!(parse("imitarix"), None);
        assert_eq!(parse("raw"), None);
        assert_eq!(parse("inline&imitari"), None);
    }

    #[test]
    fn unknown_kinds_and_formats_decline() {
        assert_eq!(parse("imitari-bogus"), None);
        assert_eq!(parse("imitari-svg-400"), None);
        assert_eq!(parse("imitari-raw-svg-400"), None);
        assert_eq!(parse("imitari-source-extra"), None);
        // alias extensions are not canonical format names
        assert_eq!(parse("imitari-jpg-400"), None);
    }

    #[test]
    fn bad_sizes_are_malformed() {
        for query in [
            "imitari-png",
            "imitari-png-",
            "imitari-png-abc",
            "imitari-png-4oo",
            "imitari-png--400",
            "imitari-png-0",
            "imitari-png-400-2",
            "imitari-raw-png",
            "imitari-raw-png-x",
            "imitari-raw-png-99999999999",
        ] {
            assert!(
                matches!(parse_query(query), Err(DirectiveError::Malformed { .. })),
                "{query} should be malformed"
            );
        }
    }

    #[test]
    fn specifier_splits_path_and_query() {
        let spec = parse_specifier("./img/cat.jpg?imitari-source")
            .unwrap()
            .unwrap();
        assert_eq!(spec.path, "./img/cat.jpg");
        assert_eq!(spec.directive, TransformDirective::Source);
    }

    #[test]
    fn specifier_without_query_declines() {
        assert_eq!(parse_specifier("./img/cat.jpg").unwrap(), None);
    }

    #[test]
    fn display_matches_grammar() {
        let cases = [
            TransformDirective::Entry,
            TransformDirective::Source,
            TransformDirective::Transformer,
            TransformDirective::Raw {
                format: Format::Avif,
                size: 1200,
            },
            TransformDirective::Image {
                format: Format::Jpeg,
                size: 480,
            },
        ];
        let rendered: Vec<String> = cases.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            rendered,
            [
                "imitari",
                "imitari-source",
                "imitari-transformer",
                "imitari-raw-avif-1200",
                "imitari-jpeg-480"
            ]
        );
        for d in cases {
            assert_eq!(parse(&d.to_string()), Some(d));
        }
    }
}
