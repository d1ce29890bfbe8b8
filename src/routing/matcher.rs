//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Compile pattern strings (`/users/:id`, `/posts/*rest`, `#:sha1`)
//! - Match a pattern against a slice of path segments
//! - Interpolate params back into a pattern (redirect targets)
//!
//! # Design Decisions
//! - Literal matching is case-sensitive
//! - `:name` matches exactly one non-empty segment
//! - `*name` must be last and captures zero or more segments joined by `/`
//! - No regex; matching is a single linear walk over the segments

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

/// Parameters captured while matching, merged root to leaf.
pub type Params = HashMap<String, String>;

/// Name given to a bare `*` wildcard.
pub const ANONYMOUS_REST: &str = "_";

/// Pattern rejected at compile time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid pattern '{pattern}': {reason}")]
pub struct InvalidPatternError {
    pub pattern: String,
    pub reason: String,
}

impl InvalidPatternError {
    fn new(pattern: &str, reason: impl Into<String>) -> Self {
        Self {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Rest(String),
}

impl Segment {
    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Param(_), Segment::Param(_)) => true,
            (Segment::Rest(_), Segment::Rest(_)) => true,
            _ => false,
        }
    }
}

/// Result of a successful pattern match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub params: Params,
    /// Number of input segments the pattern consumed.
    pub consumed: usize,
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    fragment: bool,
    exact: bool,
}

impl PathPattern {
    /// Compile a pattern string. The result is non-exact; see [`PathPattern::exact`].
    pub fn compile(pattern: &str) -> Result<Self, InvalidPatternError> {
        let (fragment, body) = match pattern.strip_prefix('#') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };

        if body.contains('#') {
            return Err(InvalidPatternError::new(
                pattern,
                "'#' is only allowed as the first character",
            ));
        }

        let mut segments: Vec<Segment> = Vec::new();
        let mut names = HashSet::new();

        for raw in body.split('/').filter(|s| !s.is_empty()) {
            if matches!(segments.last(), Some(Segment::Rest(_))) {
                let reason = if raw.starts_with('*') {
                    "consecutive wildcard segments"
                } else {
                    "wildcard segment must be last"
                };
                return Err(InvalidPatternError::new(pattern, reason));
            }

            let segment = if let Some(name) = raw.strip_prefix(':') {
                if name.is_empty() {
                    return Err(InvalidPatternError::new(pattern, "empty parameter name"));
                }
                Segment::Param(name.to_string())
            } else if let Some(name) = raw.strip_prefix('*') {
                let name = if name.is_empty() { ANONYMOUS_REST } else { name };
                Segment::Rest(name.to_string())
            } else {
                Segment::Literal(raw.to_string())
            };

            if let Segment::Param(name) | Segment::Rest(name) = &segment {
                if !names.insert(name.clone()) {
                    return Err(InvalidPatternError::new(
                        pattern,
                        format!("duplicate parameter name '{}'", name),
                    ));
                }
            }

            segments.push(segment);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
            fragment,
            exact: false,
        })
    }

    /// Set the exact flag.
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Fragment patterns match against the location hash instead of the path.
    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    /// An index pattern (`/`, `#`) consumes nothing.
    pub fn is_index(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(n) | Segment::Rest(n) => Some(n.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Match against `path`, returning captured params and how many segments were consumed.
    pub fn match_segments(&self, path: &[String]) -> Option<PatternMatch> {
        let mut params = Params::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if path.get(i)? != literal {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = path.get(i)?;
                    if value.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), value.clone());
                }
                Segment::Rest(name) => {
                    let rest = path.get(i..).unwrap_or(&[]);
                    params.insert(name.clone(), rest.join("/"));
                    return Some(PatternMatch {
                        params,
                        consumed: path.len(),
                    });
                }
            }
        }

        let consumed = self.segments.len();
        if self.exact && consumed != path.len() {
            return None;
        }

        Some(PatternMatch { params, consumed })
    }

    /// Same segment shapes, literals, exact and fragment flags. Param names are ignored.
    pub fn is_structurally_equal(&self, other: &PathPattern) -> bool {
        self.exact == other.exact
            && self.fragment == other.fragment
            && self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b))
    }

    /// Substitute params into the pattern. Missing params keep their placeholder.
    pub fn interpolate(&self, params: &Params) -> String {
        let parts: Vec<String> = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(literal) => literal.clone(),
                Segment::Param(name) => params
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| format!(":{}", name)),
                Segment::Rest(name) => params.get(name).cloned().unwrap_or_default(),
            })
            .filter(|part| !part.is_empty())
            .collect();

        let prefix = if self.fragment { "#" } else { "/" };
        format!("{}{}", prefix, parts.join("/"))
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split a raw path into non-empty segments.
pub fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
