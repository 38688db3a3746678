//! Namespace patterns used to route data access units to bindings.
//!
//! A namespace is a Rust module path such as `puml::service::sample::mapper`.
//! A pattern is a prefix of such a path in which any segment may be `*`,
//! matching exactly one segment. `puml::web` matches every module under
//! `puml::web`; `puml::service::*::mapper` matches the mapper module of every
//! service.

use std::fmt;
use std::str::FromStr;

use crate::db::{DbError, DbResult};

const SEPARATOR: &str = "::";
const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Literal(String),
    Any,
}

impl Segment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Segment::Literal(lit) => lit == segment,
            Segment::Any => true,
        }
    }

    /// Every segment matched by `self` is also matched by `other`.
    fn within(&self, other: &Segment) -> bool {
        match (self, other) {
            (_, Segment::Any) => true,
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Any, Segment::Literal(_)) => false,
        }
    }

    fn intersects(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            _ => true,
        }
    }
}

/// A parsed namespace pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl NamespacePattern {
    /// Parse a pattern such as `puml::service::*::mapper`.
    pub fn parse(raw: &str) -> DbResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DbError::Configuration {
                message: "namespace pattern must not be empty".to_string(),
            });
        }

        let segments = raw
            .split(SEPARATOR)
            .map(|segment| parse_segment(raw, segment))
            .collect::<DbResult<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether a unit owned by `namespace` falls under this pattern.
    pub fn matches(&self, namespace: &str) -> bool {
        let mut parts = namespace.split(SEPARATOR);
        self.segments
            .iter()
            .all(|segment| parts.next().is_some_and(|part| segment.matches(part)))
    }

    /// Whether every namespace matched by `self` is also matched by `other`.
    pub fn is_within(&self, other: &NamespacePattern) -> bool {
        self.segments.len() >= other.segments.len()
            && other
                .segments
                .iter()
                .zip(&self.segments)
                .all(|(theirs, ours)| ours.within(theirs))
    }

    /// Whether some namespace is matched by both patterns.
    pub fn intersects(&self, other: &NamespacePattern) -> bool {
        self.segments
            .iter()
            .zip(&other.segments)
            .all(|(a, b)| a.intersects(b))
    }

    /// Whether a namespace could match both patterns with neither one being
    /// strictly more specific. Identical patterns are ambiguous.
    pub fn is_ambiguous_with(&self, other: &NamespacePattern) -> bool {
        if !self.intersects(other) {
            return false;
        }
        let ours_narrower = self.is_within(other);
        let theirs_narrower = other.is_within(self);
        ours_narrower == theirs_narrower
    }

    /// Ordering key for most-specific-match resolution: longer patterns win,
    /// then patterns with more literal segments.
    pub(crate) fn specificity(&self) -> (usize, usize) {
        let literals = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        (self.segments.len(), literals)
    }
}

fn parse_segment(raw: &str, segment: &str) -> DbResult<Segment> {
    if segment == WILDCARD {
        return Ok(Segment::Any);
    }
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !segment.starts_with(|c: char| c.is_ascii_digit());
    if !valid {
        return Err(DbError::Configuration {
            message: format!("invalid segment '{segment}' in namespace pattern '{raw}'"),
        });
    }
    Ok(Segment::Literal(segment.to_string()))
}

impl FromStr for NamespacePattern {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NamespacePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
