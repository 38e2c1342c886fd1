//! Translation context and resource transformers
//!
//! A [`TransformContext`] is an immutable view of one translation: the
//! target, the source model being read, and where registrations come from.
//! Switching to a version delta or re-seeding the source returns a new
//! context; the original is never touched.

use crate::alias::{self, AliasContext};
use crate::chain::DeltaStep;
use crate::error::TransformError;
use crate::path::PathRewriteChain;
use crate::registry::{CommandResolution, Levels, ResolvedEntry, Resolver};
use crate::target::TransformationTarget;
use std::fmt;
use std::sync::Arc;
use xlate_model::{Address, Resource};

/// Immutable state of one translation
#[derive(Debug, Clone)]
pub struct TransformContext {
    target: Arc<TransformationTarget>,
    source: Arc<Resource>,
    resolver: Resolver,
}

impl TransformContext {
    /// Context reading `source` and resolving through the target's registry
    #[inline]
    #[must_use]
    pub fn new(target: Arc<TransformationTarget>, source: Arc<Resource>) -> Self {
        Self {
            target,
            source,
            resolver: Resolver::Registry,
        }
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &TransformationTarget {
        &self.target
    }

    /// Source model, read-only
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Resource {
        &self.source
    }

    /// Source node at `address`
    #[inline]
    #[must_use]
    pub fn read_source(&self, address: &Address) -> Option<&Resource> {
        self.source.navigate(address)
    }

    /// Check if registrations come from a version delta
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.resolver, Resolver::Placeholder(_))
    }

    /// Delta this context resolves through, if any
    #[must_use]
    pub fn delta_step(&self) -> Option<&DeltaStep> {
        match &self.resolver {
            Resolver::Placeholder(step) => Some(step.as_ref()),
            Resolver::Registry => None,
        }
    }

    /// Same source, registrations from one version delta
    #[must_use]
    pub fn with_placeholder(&self, step: Arc<DeltaStep>) -> Self {
        Self {
            target: Arc::clone(&self.target),
            source: Arc::clone(&self.source),
            resolver: Resolver::Placeholder(step),
        }
    }

    /// Same target and resolver, new source model
    ///
    /// Used between deltas: the next delta reads what the previous one wrote.
    ///
    /// # Errors
    /// Returns [`TransformError::ChainMisuse`] unless this context resolves
    /// through a version delta
    pub fn reseeded_from(&self, source: Resource) -> Result<Self, TransformError> {
        if !self.is_placeholder() {
            return Err(TransformError::ChainMisuse(
                "only a delta context can be re-seeded".to_string(),
            ));
        }
        Ok(Self {
            target: Arc::clone(&self.target),
            source: Arc::new(source),
            resolver: self.resolver.clone(),
        })
    }

    /// Same target and resolver, different source model
    #[must_use]
    pub fn with_source(&self, source: Arc<Resource>) -> Self {
        Self {
            target: Arc::clone(&self.target),
            source,
            resolver: self.resolver.clone(),
        }
    }

    pub(crate) fn levels(&self, address: &Address) -> Levels<'_> {
        self.resolver.levels(&self.target, address)
    }

    /// Entry governing the resource at `address`
    #[must_use]
    pub fn resolve_entry(&self, address: &Address) -> ResolvedEntry {
        self.levels(address).resolved()
    }

    /// Rewrite chain for `address`
    #[must_use]
    pub fn path_chain(&self, address: &Address) -> PathRewriteChain {
        self.levels(address).path_chain()
    }

    /// Address the peer expects for `address`
    ///
    /// # Errors
    /// Returns error if a rewrite rule leaves segments unclaimed
    pub fn rewrite_address(&self, address: &Address) -> Result<Address, TransformError> {
        self.path_chain(address).rewrite(address)
    }

    /// Command transformer for `name` at `address`
    #[must_use]
    pub fn command_transformer(&self, address: &Address, name: &str) -> CommandResolution {
        self.levels(address).command(name)
    }

    /// Replace registered alias prefixes until the address is canonical
    ///
    /// # Errors
    /// Returns error if aliases do not settle within the configured depth
    pub fn canonical_address(&self, address: &Address, context: AliasContext<'_>) -> Result<Address, TransformError> {
        alias::canonical_address(self, address, context)
    }
}

/// What a resource transformer produced
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    /// Write nothing; the subtree is dropped
    Discard,

    /// Write the resource as given; original children are not visited
    Replaced(Resource),

    /// Write the resource's attributes, then visit the original children
    ReplacedAndRecurse(Resource),
}

/// Per-node view handed to a [`ResourceTransformer`]
pub struct NodeScope<'a> {
    context: &'a TransformContext,
    destination: &'a Resource,
    original: &'a Address,
    rewritten: &'a Address,
}

impl<'a> NodeScope<'a> {
    pub(crate) fn new(
        context: &'a TransformContext,
        destination: &'a Resource,
        original: &'a Address,
        rewritten: &'a Address,
    ) -> Self {
        Self {
            context,
            destination,
            original,
            rewritten,
        }
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &'a TransformContext {
        self.context
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &'a TransformationTarget {
        self.context.target()
    }

    /// Address in the source model
    #[inline]
    #[must_use]
    pub fn original_address(&self) -> &'a Address {
        self.original
    }

    /// Address the node will be written at
    #[inline]
    #[must_use]
    pub fn rewritten_address(&self) -> &'a Address {
        self.rewritten
    }

    /// Source node at an absolute address
    #[inline]
    #[must_use]
    pub fn read_source(&self, address: &Address) -> Option<&'a Resource> {
        self.context.read_source(address)
    }

    /// Already-written node, relative to the rewritten parent
    #[must_use]
    pub fn read_destination(&self, relative: &Address) -> Option<&'a Resource> {
        let parent = self.rewritten.parent().unwrap_or_default();
        self.destination.navigate(&parent.append_address(relative))
    }

    /// Already-written node at an absolute address
    #[inline]
    #[must_use]
    pub fn read_destination_from_root(&self, address: &Address) -> Option<&'a Resource> {
        self.destination.navigate(address)
    }
}

impl fmt::Debug for NodeScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeScope")
            .field("original", &self.original.to_string())
            .field("rewritten", &self.rewritten.to_string())
            .finish_non_exhaustive()
    }
}

/// Translates one resource node
pub trait ResourceTransformer: Send + Sync + fmt::Debug {
    /// Produce the node the peer should see
    ///
    /// # Errors
    /// Returns error if the node cannot be translated at all
    fn transform(&self, scope: &NodeScope<'_>, resource: &Resource) -> Result<Transformed, TransformError>;
}

/// Copies the node and continues with its children
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughResource;

impl ResourceTransformer for PassThroughResource {
    fn transform(&self, _scope: &NodeScope<'_>, resource: &Resource) -> Result<Transformed, TransformError> {
        Ok(Transformed::ReplacedAndRecurse(resource.shallow_copy()))
    }
}

/// Drops the node and its subtree
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardResource;

impl ResourceTransformer for DiscardResource {
    fn transform(&self, _scope: &NodeScope<'_>, _resource: &Resource) -> Result<Transformed, TransformError> {
        Ok(Transformed::Discard)
    }
}

/// Resource transformer backed by a closure
pub struct ResourceFn<F> {
    transform: F,
}

impl<F> ResourceFn<F>
where
    F: Fn(&NodeScope<'_>, &Resource) -> Result<Transformed, TransformError> + Send + Sync,
{
    #[inline]
    #[must_use]
    pub fn new(transform: F) -> Self {
        Self { transform }
    }
}

impl<F> fmt::Debug for ResourceFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResourceFn")
    }
}

impl<F> ResourceTransformer for ResourceFn<F>
where
    F: Fn(&NodeScope<'_>, &Resource) -> Result<Transformed, TransformError> + Send + Sync,
{
    fn transform(&self, scope: &NodeScope<'_>, resource: &Resource) -> Result<Transformed, TransformError> {
        (self.transform)(scope, resource)
    }
}
