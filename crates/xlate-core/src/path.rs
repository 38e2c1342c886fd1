//! Path rewrite chains
//!
//! A rewrite chain maps an address in the sender's model to the address the
//! peer expects. It holds exactly one rule per segment of the address being
//! rewritten; rule `i` sees original segment `i` and the [`AddressBuilder`],
//! appends zero or more segments and calls [`AddressBuilder::next`] to hand
//! control to rule `i + 1`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use xlate_core::{PassThrough, PathRewriteChain, RenameKind};
//! use xlate_model::Address;
//!
//! let chain = PathRewriteChain::new(vec![
//!     Arc::new(PassThrough),
//!     Arc::new(RenameKind::new("handler")),
//! ]);
//! let original: Address = "/subsystem=logging/console=out".parse().unwrap();
//! let rewritten = chain.rewrite(&original).unwrap();
//! assert_eq!(rewritten.to_string(), "/subsystem=logging/handler=out");
//! ```

use crate::error::TransformError;
use std::fmt::Debug;
use std::sync::Arc;
use xlate_model::{Address, Segment};

/// One link of a rewrite chain
pub trait PathRewrite: Send + Sync + Debug {
    /// Rewrite `current` and continue via [`AddressBuilder::next`]
    ///
    /// # Errors
    /// Returns error if the rest of the chain fails
    fn rewrite(&self, current: &Segment, builder: &mut AddressBuilder<'_>) -> Result<(), TransformError>;
}

/// State threaded through a rewrite chain
#[derive(Debug)]
pub struct AddressBuilder<'a> {
    original: &'a Address,
    built: Vec<Segment>,
    position: usize,
    rule: usize,
    chain: &'a [Arc<dyn PathRewrite>],
}

impl<'a> AddressBuilder<'a> {
    fn new(original: &'a Address, chain: &'a [Arc<dyn PathRewrite>]) -> Self {
        Self {
            original,
            built: Vec::with_capacity(original.len()),
            position: 0,
            rule: 0,
            chain,
        }
    }

    /// Address being rewritten
    #[inline]
    #[must_use]
    pub fn original(&self) -> &Address {
        self.original
    }

    /// Segments produced so far
    #[inline]
    #[must_use]
    pub fn current(&self) -> Address {
        Address::new(self.built.clone())
    }

    /// Original segments after the one being rewritten
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> Address {
        self.original.sub_address(self.position + 1)
    }

    /// Append `segments` and pass the next original segment to the next rule
    ///
    /// # Errors
    /// Returns [`TransformError::UnclaimedSegments`] if original segments
    /// remain but the chain has no more rules.
    pub fn next(&mut self, segments: impl IntoIterator<Item = Segment>) -> Result<(), TransformError> {
        self.built.extend(segments);
        self.position += 1;

        let original = self.original;
        let Some(segment) = original.get(self.position) else {
            return Ok(());
        };

        self.rule += 1;
        let chain = self.chain;
        match chain.get(self.rule) {
            Some(rule) => rule.rewrite(segment, self),
            None => Err(TransformError::UnclaimedSegments {
                original: original.clone(),
                remaining: original.sub_address(self.position),
            }),
        }
    }

    fn finish(self) -> Result<Address, TransformError> {
        if self.position < self.original.len() {
            return Err(TransformError::UnclaimedSegments {
                original: self.original.clone(),
                remaining: self.original.sub_address(self.position),
            });
        }
        Ok(Address::new(self.built))
    }
}

/// Keeps the segment unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl PathRewrite for PassThrough {
    fn rewrite(&self, current: &Segment, builder: &mut AddressBuilder<'_>) -> Result<(), TransformError> {
        builder.next([current.clone()])
    }
}

/// Replaces the segment with a fixed one
#[derive(Debug, Clone)]
pub struct ReplaceSegment(Segment);

impl ReplaceSegment {
    #[inline]
    #[must_use]
    pub fn new(segment: impl Into<Segment>) -> Self {
        Self(segment.into())
    }
}

impl PathRewrite for ReplaceSegment {
    fn rewrite(&self, _current: &Segment, builder: &mut AddressBuilder<'_>) -> Result<(), TransformError> {
        builder.next([self.0.clone()])
    }
}

/// Keeps the name, changes the type
#[derive(Debug, Clone)]
pub struct RenameKind(String);

impl RenameKind {
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }
}

impl PathRewrite for RenameKind {
    fn rewrite(&self, current: &Segment, builder: &mut AddressBuilder<'_>) -> Result<(), TransformError> {
        builder.next([current.with_kind(self.0.as_str())])
    }
}

/// Ordered rules, one per address segment
#[derive(Debug, Clone, Default)]
pub struct PathRewriteChain {
    rules: Vec<Arc<dyn PathRewrite>>,
}

impl PathRewriteChain {
    /// Create chain
    #[inline]
    #[must_use]
    pub fn new(rules: Vec<Arc<dyn PathRewrite>>) -> Self {
        Self { rules }
    }

    /// Identity chain of `len` rules
    #[must_use]
    pub fn identity(len: usize) -> Self {
        let rule: Arc<dyn PathRewrite> = Arc::new(PassThrough);
        Self {
            rules: vec![rule; len],
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[Arc<dyn PathRewrite>] {
        &self.rules
    }

    /// Rewrite `address`
    ///
    /// The root address maps to itself.
    ///
    /// # Errors
    /// Returns [`TransformError::UnclaimedSegments`] if a segment was not
    /// claimed by any rule
    pub fn rewrite(&self, address: &Address) -> Result<Address, TransformError> {
        let Some(first) = address.first() else {
            return Ok(Address::root());
        };
        let Some(rule) = self.rules.first() else {
            return Err(TransformError::UnclaimedSegments {
                original: address.clone(),
                remaining: address.clone(),
            });
        };

        let mut builder = AddressBuilder::new(address, &self.rules);
        rule.rewrite(first, &mut builder)?;
        builder.finish()
    }
}
