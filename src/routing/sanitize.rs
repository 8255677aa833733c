//! Path normalization and validation.
//!
//! # Responsibilities
//! - Accept the router's raw path as one string or as a list of segments
//! - Strip leading slashes, drop empty and `.` segments
//! - Reject `..` segments and any raw or percent-encoded traversal / NUL token
//!
//! # Design Decisions
//! - A rejected path is the empty path; callers treat it as not proxyable
//! - The rejected input is never logged or echoed back

use std::fmt;

/// Tokens that reject the whole path when found anywhere in it (compared
/// against the lowercased path).
const FORBIDDEN_TOKENS: &[&str] = &["..", "%2e", "%00", "%2f", "%5c", "\0", "\\"];

/// Raw path input as handed over by the router.
#[derive(Debug, Clone, Copy)]
pub enum RawPath<'a> {
    /// A single slash-separated string, possibly with leading slashes.
    Joined(&'a str),
    /// Pre-split segments; joined with `/` before validation.
    Segments(&'a [String]),
}

impl<'a> From<&'a str> for RawPath<'a> {
    fn from(path: &'a str) -> Self {
        RawPath::Joined(path)
    }
}

impl<'a> From<&'a String> for RawPath<'a> {
    fn from(path: &'a String) -> Self {
        RawPath::Joined(path.as_str())
    }
}

impl<'a> From<&'a [String]> for RawPath<'a> {
    fn from(segments: &'a [String]) -> Self {
        RawPath::Segments(segments)
    }
}

impl<'a> From<&'a Vec<String>> for RawPath<'a> {
    fn from(segments: &'a Vec<String>) -> Self {
        RawPath::Segments(segments.as_slice())
    }
}

/// A validated, canonical request path: segments joined by `/`, no leading
/// slash, no `.`/`..`/empty segments.
///
/// The empty path is both "nothing requested" and "rejected"; neither is
/// eligible for proxying.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestPath(String);

impl RequestPath {
    /// The empty (rejected) path.
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for RequestPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize and validate a raw request path.
pub fn sanitize<'a>(raw: impl Into<RawPath<'a>>) -> RequestPath {
    match raw.into() {
        RawPath::Joined(path) => sanitize_joined(path),
        RawPath::Segments(segments) => sanitize_joined(&segments.join("/")),
    }
}

fn sanitize_joined(raw: &str) -> RequestPath {
    let mut segments = Vec::new();
    for segment in raw.trim_start_matches('/').split('/') {
        match segment {
            "" | "." => continue,
            ".." => return RequestPath::empty(),
            other => segments.push(other),
        }
    }

    let canonical = segments.join("/");
    let lowered = canonical.to_ascii_lowercase();
    if FORBIDDEN_TOKENS.iter().any(|token| lowered.contains(token)) {
        return RequestPath::empty();
    }

    RequestPath(canonical)
}
