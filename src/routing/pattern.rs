//! Route pattern parsing and matching.
//!
//! # Responsibilities
//! - Validate pattern syntax once, at registration
//! - Match a concrete request path against a compiled pattern
//! - Extract named parameters into [`PathParams`]
//!
//! # Syntax
//! ```text
//! /api/users/{id}          brace parameter
//! /api/users/:id           colon parameter
//! /files/{name}.{ext}      parameter ends at the next literal byte ('.')
//! /static/                 trailing '/' = prefix pattern
//! ```
//!
//! # Design Decisions
//! - Two-pointer scan over bytes, no regex
//! - A parameter captures up to its terminator byte or the next '/'
//! - Empty captures never match
//! - No escaping: delimiter characters in a request path are ordinary bytes

use thiserror::Error;

/// Errors found while parsing a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("pattern must begin with '/'")]
    MissingLeadingSlash,

    #[error("unterminated parameter starting at byte {0}")]
    Unterminated(usize),

    #[error("unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),

    #[error("empty parameter name at byte {0}")]
    EmptyName(usize),

    #[error("invalid character {ch:?} in parameter name at byte {at}")]
    InvalidName { at: usize, ch: char },

    #[error("parameter {0:?} directly follows another parameter")]
    AdjacentParams(String),

    #[error("parameter {0:?} appears more than once")]
    DuplicateName(String),
}

/// Parameters captured from a request path, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value captured for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_owned(), value.to_owned()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, terminator: u8 },
}

/// A validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl Pattern {
    /// Parse and validate a pattern.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let bytes = pattern.as_bytes();
        match bytes.first() {
            None => return Err(PatternError::Empty),
            Some(b'/') => {}
            Some(_) => return Err(PatternError::MissingLeadingSlash),
        }

        let mut segments = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'{' => {
                    push_literal(&mut segments, &pattern[literal_start..i]);
                    let name_start = i + 1;
                    let mut j = name_start;
                    while j < bytes.len() && is_name_byte(bytes[j]) {
                        j += 1;
                    }
                    if j == bytes.len() {
                        return Err(PatternError::Unterminated(i));
                    }
                    if bytes[j] != b'}' {
                        let ch = pattern[j..].chars().next().unwrap_or('\u{fffd}');
                        return Err(PatternError::InvalidName { at: j, ch });
                    }
                    if j == name_start {
                        return Err(PatternError::EmptyName(i));
                    }
                    push_param(&mut segments, &pattern[name_start..j])?;
                    i = j + 1;
                    literal_start = i;
                }
                b'}' => return Err(PatternError::UnmatchedClose(i)),
                b':' => {
                    push_literal(&mut segments, &pattern[literal_start..i]);
                    let name_start = i + 1;
                    let mut j = name_start;
                    while j < bytes.len() && is_name_byte(bytes[j]) {
                        j += 1;
                    }
                    if j == name_start {
                        return Err(PatternError::EmptyName(i));
                    }
                    push_param(&mut segments, &pattern[name_start..j])?;
                    i = j;
                    literal_start = i;
                }
                _ => i += 1,
            }
        }
        push_literal(&mut segments, &pattern[literal_start..]);

        // The terminator of a parameter is the first byte of the literal after it.
        for idx in 0..segments.len() {
            let next = match segments.get(idx + 1) {
                Some(Segment::Literal(lit)) => lit.as_bytes()[0],
                _ => b'/',
            };
            if let Segment::Param { terminator, .. } = &mut segments[idx] {
                *terminator = next;
            }
        }

        Ok(Self {
            raw: pattern.to_owned(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the pattern ends in '/' and therefore also matches deeper paths.
    pub fn is_prefix(&self) -> bool {
        self.raw.ends_with('/')
    }

    /// True when the pattern has no parameters.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|seg| matches!(seg, Segment::Literal(_)))
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|seg| match seg {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match `path` against this pattern, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let bytes = path.as_bytes();
        let mut params = PathParams::new();
        let mut i = 0;

        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    if !bytes[i..].starts_with(lit.as_bytes()) {
                        return None;
                    }
                    i += lit.len();
                }
                Segment::Param { name, terminator } => {
                    if matches!(self.segments.get(idx + 1), Some(Segment::Param { .. })) {
                        tracing::error!(
                            pattern = %self.raw,
                            param = %name,
                            "Pattern holds adjacent parameters; refusing to match"
                        );
                        return None;
                    }
                    let start = i;
                    while i < bytes.len() && bytes[i] != *terminator && bytes[i] != b'/' {
                        i += 1;
                    }
                    if i == start {
                        return None;
                    }
                    params.push(name, &path[start..i]);
                }
            }
        }

        if i == bytes.len() || self.is_prefix() {
            Some(params)
        } else {
            None
        }
    }
}

fn push_literal(segments: &mut Vec<Segment>, literal: &str) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal.to_owned()));
    }
}

fn push_param(segments: &mut Vec<Segment>, name: &str) -> Result<(), PatternError> {
    if matches!(segments.last(), Some(Segment::Param { .. })) {
        return Err(PatternError::AdjacentParams(name.to_owned()));
    }
    let duplicate = segments
        .iter()
        .any(|seg| matches!(seg, Segment::Param { name: other, .. } if other == name));
    if duplicate {
        return Err(PatternError::DuplicateName(name.to_owned()));
    }
    segments.push(Segment::Param {
        name: name.to_owned(),
        terminator: b'/',
    });
    Ok(())
}

/// Parse `pattern` and match `path` against it in one step.
///
/// An invalid pattern never matches.
pub fn match_path(pattern: &str, path: &str) -> Option<PathParams> {
    Pattern::parse(pattern).ok()?.matches(path)
}
