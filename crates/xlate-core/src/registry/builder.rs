//! Registration builder
//!
//! Descriptions are plain values assembled with chained calls and nested
//! closures, then frozen into the registry by [`RegistryBuilder::build`].
//!
//! # Example
//!
//! ```rust
//! use xlate_core::{PeerKind, RegistryBuilder, ResourceDescription};
//! use xlate_model::Version;
//!
//! let registry = RegistryBuilder::new()
//!     .feature(
//!         "logging",
//!         Version::new(1, 0, 0),
//!         ResourceDescription::new()
//!             .child(("console", "*"), |d| d.rename_kind("handler"))
//!             .discard_child(("async", "*")),
//!     )
//!     .build()
//!     .unwrap();
//! assert_eq!(registry.pattern_count(), 3 * PeerKind::ALL.len());
//! ```

use super::trie::{NodeEntry, RegistryTrie, ResourceAction};
use super::TransformerRegistry;
use crate::alias::AliasResolver;
use crate::chain::{ChainedDeltaBuilder, DeltaChain};
use crate::command::CommandTransformer;
use crate::context::ResourceTransformer;
use crate::error::TransformError;
use crate::path::{PathRewrite, RenameKind, ReplaceSegment};
use crate::target::PeerKind;
use std::sync::Arc;
use xlate_model::{Address, Segment, Version};

/// Segment type of feature roots
pub const FEATURE_TYPE: &str = "subsystem";

/// Registration for one address pattern and its described children
#[derive(Debug, Clone, Default)]
pub struct ResourceDescription {
    entry: NodeEntry,
    children: Vec<(Segment, ResourceDescription)>,
}

impl ResourceDescription {
    /// Pass-through description
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Omit the node and its subtree; commands against it are dropped
    #[must_use]
    pub fn discard(mut self) -> Self {
        self.entry.action = ResourceAction::Discard;
        self
    }

    /// Discard every child that has no registration of its own
    #[must_use]
    pub fn discard_children_by_default(mut self) -> Self {
        self.entry.discard_children = true;
        self
    }

    /// Custom path rewrite rule for this level
    #[must_use]
    pub fn path_rewrite(mut self, rule: impl PathRewrite + 'static) -> Self {
        self.entry.path = Arc::new(rule);
        self
    }

    /// Keep the name, change the segment type
    #[must_use]
    pub fn rename_kind(self, kind: impl Into<String>) -> Self {
        self.path_rewrite(RenameKind::new(kind))
    }

    /// Replace the segment with a fixed one
    #[must_use]
    pub fn replace_segment(self, segment: impl Into<Segment>) -> Self {
        self.path_rewrite(ReplaceSegment::new(segment))
    }

    /// Custom resource transformer
    #[must_use]
    pub fn transformer(mut self, transformer: impl ResourceTransformer + 'static) -> Self {
        self.entry.action = ResourceAction::Custom(Arc::new(transformer));
        self
    }

    /// Command transformer for one command name
    #[must_use]
    pub fn command(mut self, name: impl Into<String>, transformer: impl CommandTransformer + 'static) -> Self {
        self.entry.commands.insert(name.into(), Arc::new(transformer));
        self
    }

    /// Command transformer for names without their own registration
    ///
    /// With `inherited`, unregistered descendants use it too.
    #[must_use]
    pub fn default_command(mut self, transformer: impl CommandTransformer + 'static, inherited: bool) -> Self {
        self.entry.default_command = Some(Arc::new(transformer));
        self.entry.inherit_default_command = inherited;
        self
    }

    /// Mark this pattern as an alias of a canonical address
    #[must_use]
    pub fn alias(mut self, resolver: impl AliasResolver + 'static) -> Self {
        self.entry.alias = Some(Arc::new(resolver));
        self
    }

    pub(crate) fn placeholder(mut self, chain: Arc<DeltaChain>) -> Self {
        self.entry.action = ResourceAction::Placeholder(chain);
        self
    }

    /// Describe a child pattern
    #[must_use]
    pub fn child(
        mut self,
        segment: impl Into<Segment>,
        describe: impl FnOnce(ResourceDescription) -> ResourceDescription,
    ) -> Self {
        self.children.push((segment.into(), describe(Self::new())));
        self
    }

    /// Discard a child pattern
    #[must_use]
    pub fn discard_child(self, segment: impl Into<Segment>) -> Self {
        self.child(segment, Self::discard)
    }

    /// Pattern/entry pairs for this node and all described descendants
    pub(crate) fn flatten(self, at: &Address, out: &mut Vec<(Address, NodeEntry)>) {
        for (segment, child) in self.children {
            child.flatten(&at.append(segment), out);
        }
        out.push((at.clone(), self.entry));
    }
}

#[derive(Debug)]
struct Registration {
    kinds: Vec<PeerKind>,
    root: Address,
    feature: Option<String>,
    version: Option<Version>,
    description: ResourceDescription,
}

/// Collects registrations and freezes them into a [`TransformerRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registrations: Vec<Registration>,
    chains: Vec<ChainedDeltaBuilder>,
}

impl RegistryBuilder {
    /// Create empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the root model of one peer kind at one core version
    #[must_use]
    pub fn core(mut self, kind: PeerKind, version: Version, description: ResourceDescription) -> Self {
        self.registrations.push(Registration {
            kinds: vec![kind],
            root: Address::root(),
            feature: None,
            version: Some(version),
            description,
        });
        self
    }

    /// Register a feature subtree for one feature version, for every peer kind
    #[must_use]
    pub fn feature(mut self, name: impl Into<String>, version: Version, description: ResourceDescription) -> Self {
        self.push_feature(name.into(), Some(version), description);
        self
    }

    /// Register a feature subtree used when no version-specific entry applies
    #[must_use]
    pub fn feature_default(mut self, name: impl Into<String>, description: ResourceDescription) -> Self {
        self.push_feature(name.into(), None, description);
        self
    }

    /// Register a chain of version deltas for a feature
    #[must_use]
    pub fn chained_feature(mut self, chain: ChainedDeltaBuilder) -> Self {
        self.chains.push(chain);
        self
    }

    fn push_feature(&mut self, name: String, version: Option<Version>, description: ResourceDescription) {
        self.registrations.push(Registration {
            kinds: PeerKind::ALL.to_vec(),
            root: Address::single(FEATURE_TYPE, name.as_str()),
            feature: Some(name),
            version,
            description,
        });
    }

    /// Freeze into an immutable registry
    ///
    /// # Errors
    /// Returns error on duplicate registrations or malformed chains
    pub fn build(mut self) -> Result<TransformerRegistry, TransformError> {
        for chain in std::mem::take(&mut self.chains) {
            let feature = chain.feature().to_string();
            for (version, delta_chain) in chain.build()? {
                self.push_feature(
                    feature.clone(),
                    Some(version),
                    ResourceDescription::new().placeholder(delta_chain),
                );
            }
        }

        let mut trie = RegistryTrie::new();
        for registration in self.registrations {
            let mut flat = Vec::new();
            registration.description.flatten(&registration.root, &mut flat);
            for kind in &registration.kinds {
                for (pattern, entry) in &flat {
                    trie.insert(
                        kind.scope(),
                        pattern,
                        registration.feature.as_deref(),
                        registration.version,
                        entry.clone(),
                    )?;
                }
            }
        }

        tracing::debug!("built transformer registry: {} patterns", trie.len());
        Ok(TransformerRegistry::from_trie(trie))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CommandResolution, ResolvedEntry};
    use crate::target::TransformationTarget;
    use crate::command::DiscardCommand;

    fn addr(text: &str) -> Address {
        text.parse().unwrap()
    }

    fn target(registry: TransformerRegistry, logging: Option<Version>) -> TransformationTarget {
        let mut builder = TransformationTarget::builder("peer", PeerKind::Leaf, Version::new(2, 0, 0))
            .registry(Arc::new(registry));
        if let Some(version) = logging {
            builder = builder.feature_version("logging", version);
        }
        builder.build()
    }

    #[test]
    fn flatten_covers_nested_children() {
        let mut flat = Vec::new();
        ResourceDescription::new()
            .child(("a", "1"), |d| d.child(("b", "*"), ResourceDescription::discard))
            .flatten(&Address::root(), &mut flat);
        let patterns: Vec<String> = flat.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(patterns, vec!["/a=1/b=*", "/a=1", "/"]);
    }

    #[test]
    fn feature_version_selects_registration() {
        let registry = RegistryBuilder::new()
            .feature("logging", Version::new(1, 0, 0), ResourceDescription::new().discard_child(("async", "*")))
            .feature("logging", Version::new(2, 0, 0), ResourceDescription::new())
            .build()
            .unwrap();

        let old = target(registry, Some(Version::new(1, 0, 0)));
        let async_handler = addr("/subsystem=logging/async=a");
        assert!(old.registry().resolve_entry(&old, &async_handler).is_discard());

        old.set_feature_version("logging", Version::new(2, 0, 0));
        assert!(matches!(
            old.registry().resolve_entry(&old, &async_handler),
            ResolvedEntry::NotRegistered
        ));
    }

    #[test]
    fn feature_default_applies_to_unknown_versions() {
        let registry = RegistryBuilder::new()
            .feature("logging", Version::new(1, 0, 0), ResourceDescription::new())
            .feature_default("logging", ResourceDescription::new().discard())
            .build()
            .unwrap();

        let unknown = target(registry, Some(Version::new(9, 9, 9)));
        assert!(unknown
            .registry()
            .resolve_entry(&unknown, &addr("/subsystem=logging"))
            .is_discard());
    }

    #[test]
    fn core_registration_uses_core_version_and_kind() {
        let registry = RegistryBuilder::new()
            .core(
                PeerKind::Leaf,
                Version::new(2, 0, 0),
                ResourceDescription::new().child(("socket", "*"), |d| d.rename_kind("binding")),
            )
            .build()
            .unwrap();
        let leaf = target(registry, None);
        let chain = leaf.registry().path_chain(&leaf, &addr("/socket=http"));
        assert_eq!(chain.rewrite(&addr("/socket=http")).unwrap().to_string(), "/binding=http");
    }

    #[test]
    fn command_lookup_prefers_name_then_default_then_inherited() {
        let registry = RegistryBuilder::new()
            .feature_default(
                "logging",
                ResourceDescription::new()
                    .default_command(DiscardCommand, true)
                    .child(("handler", "*"), |d| d.command("enable", DiscardCommand)),
            )
            .build()
            .unwrap();
        let t = target(registry, None);
        let registry = t.registry();

        assert!(matches!(
            registry.command_transformer(&t, &addr("/subsystem=logging/handler=h"), "enable"),
            CommandResolution::Transformer(_)
        ));
        assert!(matches!(
            registry.command_transformer(&t, &addr("/subsystem=logging/handler=h"), "disable"),
            CommandResolution::NotRegistered
        ));
        assert!(matches!(
            registry.command_transformer(&t, &addr("/subsystem=logging/filter=f"), "add"),
            CommandResolution::Transformer(_)
        ));
        assert!(matches!(
            registry.command_transformer(&t, &addr("/subsystem=logging"), "add"),
            CommandResolution::Transformer(_)
        ));
    }

    #[test]
    fn discarded_resource_discards_commands() {
        let registry = RegistryBuilder::new()
            .feature_default("legacy", ResourceDescription::new().discard())
            .build()
            .unwrap();
        let t = target(registry, None);
        assert!(matches!(
            t.registry()
                .command_transformer(&t, &addr("/subsystem=legacy/thing=x"), "add"),
            CommandResolution::Discard
        ));
    }

    #[test]
    fn duplicate_feature_version_fails() {
        let result = RegistryBuilder::new()
            .feature("logging", Version::new(1, 0, 0), ResourceDescription::new())
            .feature("logging", Version::new(1, 0, 0), ResourceDescription::new())
            .build();
        assert!(matches!(result, Err(TransformError::DuplicateRegistration { .. })));
    }
}
