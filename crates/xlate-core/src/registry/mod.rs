//! Transformer registry
//!
//! The registry answers three questions for an address and a target:
//! which resource transformer applies, which path rewrite chain maps the
//! address, and which command transformer handles a command name.
//! Registrations are keyed by peer kind and by version (core version, or a
//! feature's own version for nodes under a feature root). The registry is
//! built once through [`RegistryBuilder`] and immutable afterwards.

mod builder;
mod trie;

pub use builder::{RegistryBuilder, ResourceDescription, FEATURE_TYPE};

pub(crate) use trie::{Levels, NodeEntry, RegistryTrie, ResourceAction, Selector};

use crate::chain::{DeltaChain, DeltaStep};
use crate::command::CommandTransformer;
use crate::context::{PassThroughResource, ResourceTransformer};
use crate::path::{PassThrough, PathRewrite, PathRewriteChain};
use crate::target::TransformationTarget;
use std::sync::Arc;
use xlate_model::Address;

/// Path rewrite plus resource transformer registered for an address
#[derive(Debug, Clone)]
pub struct TransformerEntry {
    path: Arc<dyn PathRewrite>,
    resource: Arc<dyn ResourceTransformer>,
}

impl TransformerEntry {
    #[inline]
    #[must_use]
    pub fn new(path: Arc<dyn PathRewrite>, resource: Arc<dyn ResourceTransformer>) -> Self {
        Self { path, resource }
    }

    /// Identity rewrite, pass-through transform
    #[must_use]
    pub fn pass_through() -> Self {
        Self::new(Arc::new(PassThrough), Arc::new(PassThroughResource))
    }

    #[inline]
    #[must_use]
    pub fn path_rewrite(&self) -> &Arc<dyn PathRewrite> {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn resource_transformer(&self) -> &Arc<dyn ResourceTransformer> {
        &self.resource
    }
}

/// Result of resolving a resource address
#[derive(Debug, Clone)]
pub enum ResolvedEntry {
    /// Nothing registered; copy through unchanged
    NotRegistered,

    /// Registered without a custom transformer; copy through unchanged
    PassThrough,

    /// Omit the node and its subtree
    Discard,

    /// Custom transformer
    Custom(TransformerEntry),

    /// Subtree handled by a chain of version deltas
    Placeholder(Arc<DeltaChain>),
}

impl ResolvedEntry {
    #[inline]
    #[must_use]
    pub fn is_discard(&self) -> bool {
        matches!(self, Self::Discard)
    }
}

/// Result of resolving a command
#[derive(Debug, Clone)]
pub enum CommandResolution {
    /// Nothing registered; forward unchanged apart from the address
    NotRegistered,

    /// Drop the command; the sender sees a success
    Discard,

    /// Custom transformer
    Transformer(Arc<dyn CommandTransformer>),

    /// Command handled by a chain of version deltas
    Placeholder(Arc<DeltaChain>),
}

/// Immutable registry of transformers per peer kind and version
#[derive(Debug, Default)]
pub struct TransformerRegistry {
    trie: RegistryTrie,
}

impl TransformerRegistry {
    /// Start building a registry
    #[inline]
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry without registrations; everything passes through
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_trie(trie: RegistryTrie) -> Self {
        Self { trie }
    }

    /// Number of registered address patterns across all peer kinds
    #[inline]
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.trie.len()
    }

    fn levels<'a>(&'a self, target: &TransformationTarget, address: &Address) -> Levels<'a> {
        self.trie
            .levels(target.kind().scope(), address, Selector::Target(target))
    }

    /// Entry governing the resource at `address` for `target`
    #[must_use]
    pub fn resolve_entry(&self, target: &TransformationTarget, address: &Address) -> ResolvedEntry {
        self.levels(target, address).resolved()
    }

    /// Rewrite chain for `address`, exactly one rule per segment
    #[must_use]
    pub fn path_chain(&self, target: &TransformationTarget, address: &Address) -> PathRewriteChain {
        self.levels(target, address).path_chain()
    }

    /// Command transformer for `name` at `address`
    #[must_use]
    pub fn command_transformer(
        &self,
        target: &TransformationTarget,
        address: &Address,
        name: &str,
    ) -> CommandResolution {
        self.levels(target, address).command(name)
    }
}

/// Source of registrations for a translation context
#[derive(Debug, Clone)]
pub(crate) enum Resolver {
    /// The target's own registry
    Registry,
    /// One version delta of a chain
    Placeholder(Arc<DeltaStep>),
}

impl Resolver {
    pub(crate) fn levels<'a>(&'a self, target: &'a TransformationTarget, address: &Address) -> Levels<'a> {
        match self {
            Self::Registry => target.registry().levels(target, address),
            Self::Placeholder(step) => step.levels(address),
        }
    }
}
