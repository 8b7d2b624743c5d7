//! JSONPaths field mapping
//!
//! A JSONPaths document lists one path expression per target column, in
//! column order:
//!
//! ```text
//! {
//!     "jsonpaths": [
//!         "$['artist']",
//!         "$.auth",
//!         "$[\"firstName\"]",
//!         "$.location.city",
//!         "$.tags[0]"
//!     ]
//! }
//! ```
//!
//! Expressions start at `$` and select members with dot or bracket notation
//! and array elements with `[n]`. A path that selects nothing yields NULL.

use serde::Deserialize;
use serde_json::Value;

use crate::data::DataError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Member(String),
    Index(usize),
}

/// One parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    pub fn parse(expr: &str) -> Result<Self, String> {
        let rest = expr
            .trim()
            .strip_prefix('$')
            .ok_or_else(|| format!("'{}' must start with '$'", expr))?;

        let chars: Vec<char> = rest.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
                        end += 1;
                    }
                    if end == start {
                        return Err(format!("'{}' has an empty member name", expr));
                    }
                    segments.push(PathSegment::Member(chars[start..end].iter().collect()));
                    i = end;
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|&c| c == ']')
                        .map(|p| i + p)
                        .ok_or_else(|| format!("'{}' has an unterminated '['", expr))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    segments.push(parse_bracket(&inner).ok_or_else(|| {
                        format!("'{}' has an invalid subscript '[{}]'", expr, inner)
                    })?);
                    i = close + 1;
                }
                c => return Err(format!("'{}' has an unexpected '{}'", expr, c)),
            }
        }

        if segments.is_empty() {
            return Err(format!("'{}' does not select a field", expr));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Select the value this path points at, if any
    pub fn extract<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(record, |value, segment| match segment {
                PathSegment::Member(name) => value.get(name.as_str()),
                PathSegment::Index(index) => value.get(*index),
            })
    }
}

fn parse_bracket(inner: &str) -> Option<PathSegment> {
    let inner = inner.trim();
    for quote in ['\'', '"'] {
        if let Some(name) = inner
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return Some(PathSegment::Member(name.to_string()));
        }
    }
    inner.parse::<usize>().ok().map(PathSegment::Index)
}

#[derive(Deserialize)]
struct JsonPathsDocument {
    jsonpaths: Vec<String>,
}

/// Parsed JSONPaths document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPaths {
    paths: Vec<JsonPath>,
}

impl JsonPaths {
    /// Parse a document read from `source_name`
    pub fn from_slice(source_name: &str, bytes: &[u8]) -> Result<Self, DataError> {
        let document: JsonPathsDocument = serde_json::from_slice(bytes)
            .map_err(|e| DataError::jsonpaths(source_name, e.to_string()))?;

        let paths = document
            .jsonpaths
            .iter()
            .map(|expr| JsonPath::parse(expr))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| DataError::jsonpaths(source_name, reason))?;

        let paths = Self { paths };
        if paths.is_empty() {
            return Err(DataError::jsonpaths(source_name, "document lists no paths"));
        }

        tracing::debug!(source = source_name, paths = paths.len(), "Parsed JSONPaths");
        Ok(paths)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// One value per path, NULL where the record has no such field
    pub fn extract<'a>(&self, record: &'a Value) -> Vec<Option<&'a Value>> {
        self.paths.iter().map(|path| path.extract(record)).collect()
    }
}
