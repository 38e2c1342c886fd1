//! Alias addresses
//!
//! An alias is a second address for a resource that lives elsewhere. Before
//! a command or a model node is resolved, every registered alias prefix of
//! its address is replaced by the canonical address, so the peer sees one
//! address per resource.

use crate::command::{transform_at, CommandScope, CommandTransformer, TransformedCommand};
use crate::context::{NodeScope, PassThroughResource, ResourceTransformer, TransformContext, Transformed};
use crate::error::TransformError;
use crate::registry::ResolvedEntry;
use std::fmt;
use std::sync::Arc;
use xlate_model::{Address, Command, Resource};

/// What alias resolution may inspect
#[derive(Debug, Clone, Copy)]
pub enum AliasContext<'a> {
    /// The command being translated
    Command(&'a Command),
    /// The resource being translated
    Resource(&'a Resource),
    /// Nothing
    None,
}

/// Maps an alias address to its canonical address
pub trait AliasResolver: Send + Sync + fmt::Debug {
    /// Canonical address for `alias`, or `None` if it is not an alias here
    fn canonical(&self, alias: &Address, context: AliasContext<'_>) -> Option<Address>;
}

/// Alias of one fixed canonical address
///
/// Wildcard segments of the canonical address take the name of the alias
/// segment at the same position.
#[derive(Debug, Clone)]
pub struct StaticAlias {
    canonical: Address,
}

impl StaticAlias {
    #[inline]
    #[must_use]
    pub fn new(canonical: Address) -> Self {
        Self { canonical }
    }
}

impl AliasResolver for StaticAlias {
    fn canonical(&self, alias: &Address, _context: AliasContext<'_>) -> Option<Address> {
        let segments = self
            .canonical
            .iter()
            .enumerate()
            .map(|(i, segment)| match alias.get(i) {
                Some(actual) if segment.is_wildcard() => segment.with_name(actual.name()),
                _ => segment.clone(),
            })
            .collect();
        Some(Address::new(segments))
    }
}

pub(crate) fn canonical_address(
    context: &TransformContext,
    address: &Address,
    alias_context: AliasContext<'_>,
) -> Result<Address, TransformError> {
    let limit = context.target().config().max_alias_depth;
    let mut current = address.clone();
    let mut hops = 0;

    loop {
        let levels = context.levels(&current);
        let Some((depth, resolver)) = levels.alias() else {
            return Ok(current);
        };
        let prefix = current.sub_range(0, depth);
        let Some(canonical) = resolver.canonical(&prefix, alias_context) else {
            return Ok(current);
        };

        if canonical.is_multi_target() && !prefix.is_multi_target() {
            return Err(TransformError::ResolutionFailed {
                address: current,
                reason: format!("alias {prefix} resolved to wildcard address {canonical}"),
            });
        }
        if hops == limit {
            return Err(TransformError::AliasCycle {
                address: address.clone(),
                hops,
            });
        }

        tracing::trace!("alias {} -> {}", prefix, canonical);
        current = canonical.append_address(&current.sub_address(depth));
        hops += 1;
    }
}

/// Delegates to whatever is registered at a rewritten address
///
/// Registered at an alias pattern, it translates alias commands and
/// resources exactly as their canonical counterparts.
pub struct AliasTransformer {
    rewrite: Arc<dyn Fn(&Address) -> Address + Send + Sync>,
}

impl AliasTransformer {
    #[must_use]
    pub fn new(rewrite: impl Fn(&Address) -> Address + Send + Sync + 'static) -> Self {
        Self {
            rewrite: Arc::new(rewrite),
        }
    }

    /// Delegate to the transformers of a fixed canonical address
    #[must_use]
    pub fn to(canonical: Address) -> Self {
        let alias = StaticAlias::new(canonical);
        Self::new(move |address| alias.canonical(address, AliasContext::None).unwrap_or_else(|| address.clone()))
    }
}

impl fmt::Debug for AliasTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AliasTransformer")
    }
}

impl CommandTransformer for AliasTransformer {
    fn transform(&self, scope: &CommandScope<'_>, command: Command) -> Result<TransformedCommand, TransformError> {
        let original = scope.original_address();
        let delegate = (self.rewrite)(original);
        if &delegate == original {
            return Ok(TransformedCommand::pass_through(command));
        }
        transform_at(scope.context(), &delegate, &command)
    }
}

impl ResourceTransformer for AliasTransformer {
    fn transform(&self, scope: &NodeScope<'_>, resource: &Resource) -> Result<Transformed, TransformError> {
        let original = scope.original_address();
        let delegate = (self.rewrite)(original);
        if &delegate == original {
            return PassThroughResource.transform(scope, resource);
        }
        match scope.context().resolve_entry(&delegate) {
            ResolvedEntry::Custom(entry) => entry.resource_transformer().transform(scope, resource),
            ResolvedEntry::Discard => Ok(Transformed::Discard),
            _ => PassThroughResource.transform(scope, resource),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::transform_command;
    use crate::config::EngineConfig;
    use crate::registry::{RegistryBuilder, ResourceDescription, TransformerRegistry};
    use crate::target::{PeerKind, TransformationTarget};
    use crate::tree::transform_tree;
    use serde_json::json;
    use xlate_model::Version;

    fn addr(text: &str) -> Address {
        text.parse().unwrap()
    }

    fn context_with(registry: TransformerRegistry, config: EngineConfig) -> TransformContext {
        let target = TransformationTarget::builder("peer", PeerKind::Leaf, Version::new(1, 0, 0))
            .registry(Arc::new(registry))
            .config(config)
            .build();
        TransformContext::new(Arc::new(target), Arc::new(Resource::new()))
    }

    fn registry() -> TransformerRegistry {
        RegistryBuilder::new()
            .feature_default(
                "logging",
                ResourceDescription::new()
                    .child(("handler", "*"), |d| {
                        d.rename_kind("appender")
                            .command("enable", crate::command::DiscardCommand)
                    })
                    .child(("console", "*"), |d| {
                        d.alias(StaticAlias::new(addr("/subsystem=logging/handler=*")))
                    }),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn static_alias_fills_wildcards() {
        let alias = StaticAlias::new(addr("/subsystem=logging/handler=*"));
        let canonical = alias
            .canonical(&addr("/subsystem=logging/console=out"), AliasContext::None)
            .unwrap();
        assert_eq!(canonical.to_string(), "/subsystem=logging/handler=out");
    }

    #[test]
    fn alias_and_canonical_commands_translate_identically() {
        let context = context_with(registry(), EngineConfig::default());
        let via_alias = transform_command(
            &context,
            &Command::new("write-attribute", addr("/subsystem=logging/console=out")).param("value", 1),
        )
        .unwrap();
        let direct = transform_command(
            &context,
            &Command::new("write-attribute", addr("/subsystem=logging/handler=out")).param("value", 1),
        )
        .unwrap();
        assert_eq!(via_alias.command(), direct.command());
        assert_eq!(
            direct.command().unwrap().address().to_string(),
            "/subsystem=logging/appender=out"
        );

        let enable = transform_command(&context, &Command::new("enable", addr("/subsystem=logging/console=out"))).unwrap();
        assert!(enable.is_discarded());
    }

    #[test]
    fn alias_suffix_is_kept() {
        let context = context_with(registry(), EngineConfig::default());
        let canonical = context
            .canonical_address(&addr("/subsystem=logging/console=out/filter=f"), AliasContext::None)
            .unwrap();
        assert_eq!(canonical.to_string(), "/subsystem=logging/handler=out/filter=f");
    }

    #[test]
    fn self_referencing_alias_is_a_cycle() {
        let registry = RegistryBuilder::new()
            .feature_default(
                "loop",
                ResourceDescription::new().child(("a", "*"), |d| d.alias(StaticAlias::new(addr("/subsystem=loop/a=*")))),
            )
            .build()
            .unwrap();
        let context = context_with(registry, EngineConfig::default().with_max_alias_depth(3));
        let err = context
            .canonical_address(&addr("/subsystem=loop/a=1"), AliasContext::None)
            .unwrap_err();
        assert!(matches!(err, TransformError::AliasCycle { hops: 3, .. }));
    }

    #[test]
    fn alias_to_wildcard_from_concrete_fails() {
        let registry = RegistryBuilder::new()
            .feature_default(
                "logging",
                ResourceDescription::new().child(("console", "out"), |d| {
                    d.alias(StaticAlias::new(addr("/subsystem=logging/handler=*/x=*")))
                }),
            )
            .build()
            .unwrap();
        let context = context_with(registry, EngineConfig::default());
        let err = context
            .canonical_address(&addr("/subsystem=logging/console=out"), AliasContext::None)
            .unwrap_err();
        assert!(matches!(err, TransformError::ResolutionFailed { .. }));
    }

    #[test]
    fn alias_transformer_delegates_resource_translation() {
        let registry = RegistryBuilder::new()
            .feature_default(
                "logging",
                ResourceDescription::new()
                    .child(("handler", "*"), |d| {
                        d.transformer(crate::context::ResourceFn::new(|_, resource: &Resource| {
                            Ok(Transformed::ReplacedAndRecurse(resource.shallow_copy().attribute("canonical", true)))
                        }))
                    })
                    .child(("console", "*"), |d| {
                        d.transformer(AliasTransformer::to(addr("/subsystem=logging/handler=*")))
                    }),
            )
            .build()
            .unwrap();
        let target = TransformationTarget::builder("peer", PeerKind::Leaf, Version::new(1, 0, 0))
            .registry(Arc::new(registry))
            .build();
        let source = Resource::new().child(
            ("subsystem", "logging"),
            Resource::new().child(("console", "out"), Resource::new()),
        );
        let context = TransformContext::new(Arc::new(target), Arc::new(source));
        let out = transform_tree(&context).unwrap();
        assert_eq!(
            out.navigate(&addr("/subsystem=logging/console=out"))
                .and_then(|r| r.get_attribute("canonical")),
            Some(&json!(true))
        );
    }

    #[test]
    fn alias_transformer_delegates_commands() {
        let registry = RegistryBuilder::new()
            .feature_default(
                "logging",
                ResourceDescription::new()
                    .child(("handler", "*"), |d| d.rename_kind("appender"))
                    .child(("console", "*"), |d| {
                        d.default_command(AliasTransformer::to(addr("/subsystem=logging/handler=*")), false)
                    }),
            )
            .build()
            .unwrap();
        let context = context_with(registry, EngineConfig::default());
        let out = transform_command(&context, &Command::new("add", addr("/subsystem=logging/console=out"))).unwrap();
        assert_eq!(
            out.command().unwrap().address().to_string(),
            "/subsystem=logging/appender=out"
        );
    }

    #[test]
    fn alias_resources_are_written_at_the_canonical_address() {
        let target = TransformationTarget::builder("peer", PeerKind::Leaf, Version::new(1, 0, 0))
            .registry(Arc::new(registry()))
            .build();
        let logging = |kind: &str| {
            Resource::new().child(
                ("subsystem", "logging"),
                Resource::new().child(
                    (kind, "out"),
                    Resource::new()
                        .attribute("level", "INFO")
                        .child(("filter", "f"), Resource::new()),
                ),
            )
        };
        let target = Arc::new(target);
        let via_alias = transform_tree(&TransformContext::new(Arc::clone(&target), Arc::new(logging("console")))).unwrap();
        let direct = transform_tree(&TransformContext::new(target, Arc::new(logging("handler")))).unwrap();

        assert_eq!(via_alias, direct);
        assert!(via_alias.navigate(&addr("/subsystem=logging/console=out")).is_none());
        assert!(via_alias
            .navigate(&addr("/subsystem=logging/appender=out/filter=f"))
            .is_some());
    }

    #[test]
    fn alias_and_canonical_node_collide() {
        let target = TransformationTarget::builder("peer", PeerKind::Leaf, Version::new(1, 0, 0))
            .registry(Arc::new(registry()))
            .build();
        let source = Resource::new().child(
            ("subsystem", "logging"),
            Resource::new()
                .child(("handler", "out"), Resource::new())
                .child(("console", "out"), Resource::new()),
        );
        let err = transform_tree(&TransformContext::new(Arc::new(target), Arc::new(source))).unwrap_err();
        assert!(matches!(err, TransformError::DuplicateResource { .. }));
    }
}
