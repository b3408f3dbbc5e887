use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid regex"));

/// A restricted dot-path into the execution document, e.g. `$.prepared.artifactKey`.
///
/// Paths always start at the document root (`$`) and address nested object
/// keys only; there is no wildcard, index, or filter syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPath {
    segments: Vec<String>,
}

impl DocPath {
    pub fn parse(input: &str) -> Result<Self, PathSyntaxError> {
        let s = input.trim();
        let Some(rest) = s.strip_prefix('$') else {
            return Err(PathSyntaxError::MissingDollarPrefix);
        };
        if rest.is_empty() {
            return Err(PathSyntaxError::EmptyPath);
        }
        let Some(rest) = rest.strip_prefix('.') else {
            return Err(PathSyntaxError::MissingDotAfterRoot);
        };

        let mut segments = Vec::new();
        for part in rest.split('.') {
            if part.is_empty() {
                return Err(PathSyntaxError::EmptySegment);
            }
            if !SEGMENT_RE.is_match(part) {
                return Err(PathSyntaxError::InvalidSegment(part.to_string()));
            }
            segments.push(part.to_string());
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The single top-level key, if this path is exactly one segment deep.
    ///
    /// Result paths are required to be this shape: a stage merges its output
    /// under one new top-level key of the execution document.
    pub fn as_top_level_key(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for seg in &self.segments {
            write!(f, ".{seg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathSyntaxError {
    #[error("document path must start with '$'")]
    MissingDollarPrefix,
    #[error("document path must address at least one key (bare '$' is not allowed)")]
    EmptyPath,
    #[error("expected '.' after '$'")]
    MissingDotAfterRoot,
    #[error("path segment must not be empty")]
    EmptySegment,
    #[error("invalid path segment: {0}")]
    InvalidSegment(String),
}
