//! Resource addresses
//!
//! Provides [`Address`], an ordered sequence of `(type, name)` [`Segment`]s
//! locating one node of the configuration tree.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Name matching any segment name of the same type
pub const WILDCARD: &str = "*";

/// One `(type, name)` pair of an address
///
/// The name may be [`WILDCARD`], in which case the segment is a pattern
/// matching every sibling of the given type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Segment {
    kind: String,
    name: String,
}

impl Segment {
    /// Create new segment
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a wildcard segment for `kind`
    #[inline]
    #[must_use]
    pub fn wildcard(kind: impl Into<String>) -> Self {
        Self::new(kind, WILDCARD)
    }

    /// Segment type
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Segment name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the name is the wildcard
    #[inline]
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }

    /// Check if this concrete segment matches `pattern`
    ///
    /// Types must be equal; a wildcard pattern name matches any name.
    #[inline]
    #[must_use]
    pub fn matches(&self, pattern: &Segment) -> bool {
        self.kind == pattern.kind && (pattern.is_wildcard() || self.name == pattern.name)
    }

    /// Same name under a different type
    #[inline]
    #[must_use]
    pub fn with_kind(&self, kind: impl Into<String>) -> Self {
        Self::new(kind, self.name.clone())
    }

    /// Same type with a different name
    #[inline]
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self::new(self.kind.clone(), name)
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", escape(&self.kind), escape(&self.name))
    }
}

impl<K: Into<String>, N: Into<String>> From<(K, N)> for Segment {
    fn from((kind, name): (K, N)) -> Self {
        Self::new(kind, name)
    }
}

/// Address of a node within the configuration tree
///
/// Immutable: every "modifying" operation returns a new address and leaves
/// `self` untouched.
///
/// # Examples
/// - `[]` → `/` (the root)
/// - `[("subsystem", "logging"), ("handler", "console")]` →
///   `/subsystem=logging/handler=console`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(Vec<Segment>);

impl Address {
    /// Create address from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Empty address (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Address with a single segment
    #[inline]
    #[must_use]
    pub fn single(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self(vec![Segment::new(kind, name)])
    }

    /// Build from `(type, name)` pairs
    #[must_use]
    pub fn from_pairs<K, N>(pairs: impl IntoIterator<Item = (K, N)>) -> Self
    where
        K: Into<String>,
        N: Into<String>,
    {
        Self(pairs.into_iter().map(Segment::from).collect())
    }

    /// Get segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if this is the root address
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Segment at `index`
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.0.get(index)
    }

    /// First segment (if not root)
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&Segment> {
        self.0.first()
    }

    /// Last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Parent address (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a segment, returning a new address
    #[inline]
    #[must_use]
    pub fn append(&self, segment: Segment) -> Self {
        let mut new = self.clone();
        new.0.push(segment);
        new
    }

    /// Append a `(type, name)` child, returning a new address
    #[inline]
    #[must_use]
    pub fn child(&self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.append(Segment::new(kind, name))
    }

    /// Append all segments of `other`
    #[inline]
    #[must_use]
    pub fn append_address(&self, other: &Address) -> Self {
        let mut new = self.clone();
        new.0.extend(other.0.iter().cloned());
        new
    }

    /// Suffix starting at `start`
    ///
    /// Out-of-range starts yield the root address.
    #[inline]
    #[must_use]
    pub fn sub_address(&self, start: usize) -> Self {
        self.sub_range(start, self.0.len())
    }

    /// Segments `[start, end)`, clamped to the address length
    #[inline]
    #[must_use]
    pub fn sub_range(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.0.len());
        if start >= end {
            return Self::root();
        }
        Self(self.0[start..end].to_vec())
    }

    /// Check if any segment is a wildcard
    #[inline]
    #[must_use]
    pub fn is_multi_target(&self) -> bool {
        self.0.iter().any(Segment::is_wildcard)
    }

    /// Check if this address matches `pattern` segment by segment
    #[must_use]
    pub fn matches(&self, pattern: &Address) -> bool {
        self.0.len() == pattern.0.len()
            && self.0.iter().zip(&pattern.0).all(|(s, p)| s.matches(p))
    }

    /// Check if `pattern` matches this address or one of its ancestors
    #[must_use]
    pub fn is_under(&self, pattern: &Address) -> bool {
        pattern.0.len() <= self.0.len()
            && self.0.iter().zip(&pattern.0).all(|(s, p)| s.matches(p))
    }

    /// Check if this address is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.0.iter()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix('/').unwrap_or(s);
        if body.is_empty() {
            return Ok(Self::root());
        }

        let segments = split_unescaped(body, '/')?
            .into_iter()
            .map(|raw| parse_segment(&raw))
            .collect::<Result<_, _>>()?;
        Ok(Self(segments))
    }
}

impl From<Vec<Segment>> for Address {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl From<Segment> for Address {
    fn from(segment: Segment) -> Self {
        Self(vec![segment])
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '/' | '=' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split on `separator` outside escapes, keeping escapes in the pieces
fn split_unescaped(raw: &str, separator: char) -> Result<Vec<String>, AddressError> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let escaped = chars.next().ok_or(AddressError::DanglingEscape)?;
            current.push('\\');
            current.push(escaped);
        } else if c == separator {
            pieces.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    pieces.push(current);
    Ok(pieces)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_segment(raw: &str) -> Result<Segment, AddressError> {
    if raw.is_empty() {
        return Err(AddressError::EmptySegment);
    }
    let parts = split_unescaped(raw, '=')?;
    match parts.as_slice() {
        [kind, name] if kind.is_empty() => Err(AddressError::EmptyType(name.clone())),
        [_, name] if name.is_empty() => Err(AddressError::MissingName(raw.to_string())),
        [kind, name] => Ok(Segment::new(unescape(kind), unescape(name))),
        _ => Err(AddressError::MissingName(raw.to_string())),
    }
}

/// Errors related to addresses
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    /// Empty segment in address text
    #[error("address contains empty segment")]
    EmptySegment,

    /// Segment without `=name`
    #[error("segment '{0}' must have the form type=name")]
    MissingName(String),

    /// Segment with an empty type
    #[error("segment for name '{0}' has an empty type")]
    EmptyType(String),

    /// Trailing backslash
    #[error("address ends with a dangling escape")]
    DanglingEscape,
}
