//! Resource tree translation
//!
//! Walks the source model depth-first, resolves each node, and writes the
//! result at its rewritten address in a separate destination tree. A node
//! is only written if its rewritten parent already exists there.

use crate::alias::AliasContext;
use crate::chain::DeltaChain;
use crate::context::{NodeScope, PassThroughResource, ResourceTransformer, TransformContext, Transformed};
use crate::error::TransformError;
use crate::registry::ResolvedEntry;
use std::sync::Arc;
use xlate_model::{Address, Resource};

/// Translate the whole source model of `context`
///
/// # Errors
/// Returns the first configuration error hit; no partial tree is returned
pub fn transform_tree(context: &TransformContext) -> Result<Resource, TransformError> {
    let mut destination = Resource::new();
    process(context, &mut destination, &Address::root(), context.source(), 0)?;
    Ok(destination)
}

/// Translate the subtree at `address` of the source model
///
/// The result is rooted at the peer's root: rewritten ancestors of the
/// subtree are present but empty. Returns `None` if the source has no node
/// at `address`.
///
/// # Errors
/// Returns the first configuration error hit
pub fn transform_subtree(context: &TransformContext, address: &Address) -> Result<Option<Resource>, TransformError> {
    let Some(node) = context.read_source(address) else {
        return Ok(None);
    };
    let Some(parent) = address.parent() else {
        return transform_tree(context).map(Some);
    };

    let written_parent = written_address(context, &parent)?;
    let mut destination = Resource::skeleton(&written_parent, Resource::new());
    process(context, &mut destination, address, node, address.len())?;
    Ok(Some(destination))
}

fn process(
    context: &TransformContext,
    destination: &mut Resource,
    address: &Address,
    node: &Resource,
    depth: usize,
) -> Result<(), TransformError> {
    let limit = context.target().config().max_tree_depth;
    if depth > limit {
        return Err(TransformError::DepthExceeded {
            address: address.clone(),
            limit,
        });
    }

    if node.is_runtime_only() || node.is_remote() {
        tracing::trace!("skipping {}: runtime-only or remote", address);
        return Ok(());
    }
    if context.target().is_excluded(address) {
        tracing::debug!("skipping {}: ignored by {}", address, context.target().name());
        return Ok(());
    }

    let canonical = context.canonical_address(address, AliasContext::Resource(node))?;
    if canonical != *address {
        tracing::debug!("alias {} -> {}", address, canonical);
        if context.target().is_excluded(&canonical) {
            tracing::debug!("skipping {}: ignored by {}", canonical, context.target().name());
            return Ok(());
        }
    }

    let entry = context.resolve_entry(&canonical);
    let transformer: &dyn ResourceTransformer = match &entry {
        ResolvedEntry::Discard => {
            tracing::debug!("discarding {}", address);
            return Ok(());
        }
        ResolvedEntry::Placeholder(chain) => {
            return process_chain(context, destination, &canonical, node, chain, depth);
        }
        ResolvedEntry::Custom(custom) => custom.resource_transformer().as_ref(),
        ResolvedEntry::PassThrough | ResolvedEntry::NotRegistered => &PassThroughResource,
    };

    let rewritten = context.rewrite_address(&canonical)?;
    let ordered = ordered_position(context, &canonical, &rewritten)?;

    let outcome = {
        let scope = NodeScope::new(context, destination, address, &rewritten);
        transformer.transform(&scope, node)?
    };
    tracing::trace!("{} -> {}", address, rewritten);

    match outcome {
        Transformed::Discard => Ok(()),
        Transformed::Replaced(resource) => write(destination, &rewritten, resource, ordered),
        Transformed::ReplacedAndRecurse(resource) => {
            write(destination, &rewritten, resource.without_children(), ordered)?;
            for (segment, child) in node.iter_children() {
                process(context, destination, &address.append(segment), child, depth + 1)?;
            }
            Ok(())
        }
    }
}

/// Whether the node sits in an order-preserving collection
///
/// Such a node may be renamed but must keep its type.
fn ordered_position(context: &TransformContext, original: &Address, rewritten: &Address) -> Result<bool, TransformError> {
    let (Some(parent), Some(last)) = (original.parent(), original.last()) else {
        return Ok(false);
    };
    let ordered = context
        .read_source(&parent)
        .is_some_and(|node| node.is_ordered(last.kind()));

    if ordered && rewritten.last().map(|segment| segment.kind()) != Some(last.kind()) {
        return Err(TransformError::OrderedChildRenamed {
            original: original.clone(),
            rewritten: rewritten.clone(),
        });
    }
    Ok(ordered)
}

fn write(destination: &mut Resource, rewritten: &Address, resource: Resource, ordered: bool) -> Result<(), TransformError> {
    let (Some(parent), Some(last)) = (rewritten.parent(), rewritten.last()) else {
        destination.set_attributes(resource.attributes().clone());
        for (segment, child) in resource.iter_children() {
            destination.insert_child(segment, child.clone());
        }
        return Ok(());
    };

    let Some(parent_node) = destination.navigate_mut(&parent) else {
        return Err(TransformError::MissingAncestor {
            address: rewritten.clone(),
        });
    };
    if parent_node.has_child(last) {
        return Err(TransformError::DuplicateResource {
            address: rewritten.clone(),
        });
    }
    if ordered {
        parent_node.set_ordered(last.kind(), true);
    }
    parent_node.insert_child(last.clone(), resource);
    Ok(())
}

/// Run a subtree through every delta of `chain`
///
/// The first delta reads the original source. Each later delta reads what
/// the previous one produced, re-rooted at the address it was written at.
/// Only the output of the last delta reaches `destination`.
fn process_chain(
    context: &TransformContext,
    destination: &mut Resource,
    address: &Address,
    node: &Resource,
    chain: &DeltaChain,
    depth: usize,
) -> Result<(), TransformError> {
    let mut steps = chain.steps().iter();
    let Some(first) = steps.next() else {
        return Err(TransformError::ResolutionFailed {
            address: address.clone(),
            reason: "empty delta chain".to_string(),
        });
    };

    let mut current = context.with_placeholder(Arc::clone(first));
    let Some((mut at, mut produced)) = run_step(&current, address, node, depth)? else {
        return Ok(());
    };

    for step in steps {
        current = current
            .reseeded_from(Resource::skeleton(&at, produced))?
            .with_placeholder(Arc::clone(step));
        let Some(seed) = current.read_source(&at) else {
            return Ok(());
        };
        let Some(next) = run_step(&current, &at, seed, depth)? else {
            return Ok(());
        };
        (at, produced) = next;
    }

    let ordered = ordered_position(context, address, &at)?;
    write(destination, &at, produced, ordered)
}

/// Translate one subtree with a single delta, away from the destination
fn run_step(
    context: &TransformContext,
    address: &Address,
    node: &Resource,
    depth: usize,
) -> Result<Option<(Address, Resource)>, TransformError> {
    let written = context.rewrite_address(address)?;
    let mut scratch = Resource::skeleton(&written.parent().unwrap_or_default(), Resource::new());
    process(context, &mut scratch, address, node, depth)?;

    let output = detach(&mut scratch, &written);
    if output.is_none() {
        tracing::debug!("{} dropped by a version delta", address);
    }
    Ok(output.map(|resource| (written, resource)))
}

/// Address `address` ends up at once every applicable delta ran
fn written_address(context: &TransformContext, address: &Address) -> Result<Address, TransformError> {
    match context.resolve_entry(address) {
        ResolvedEntry::Placeholder(chain) => chain.steps().iter().try_fold(address.clone(), |at, step| {
            context.with_placeholder(Arc::clone(step)).rewrite_address(&at)
        }),
        _ => context.rewrite_address(address),
    }
}

fn detach(destination: &mut Resource, address: &Address) -> Option<Resource> {
    if address.is_empty() {
        return Some(std::mem::take(destination));
    }
    destination.remove_at(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::registry::{RegistryBuilder, ResourceDescription, TransformerRegistry};
    use crate::target::{PeerKind, TransformationTarget};
    use crate::context::ResourceFn;
    use crate::path::{AddressBuilder, PathRewrite};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use xlate_model::{Segment, Version};

    fn addr(text: &str) -> Address {
        text.parse().unwrap()
    }

    fn context(registry: TransformerRegistry, source: Resource) -> TransformContext {
        let target = TransformationTarget::builder("peer", PeerKind::Leaf, Version::new(1, 0, 0))
            .feature_version("web", Version::new(1, 0, 0))
            .registry(Arc::new(registry))
            .build();
        TransformContext::new(Arc::new(target), Arc::new(source))
    }

    fn sample() -> Resource {
        Resource::new()
            .attribute("name", "host")
            .child(
                ("subsystem", "web"),
                Resource::new()
                    .attribute("enabled", true)
                    .child(("connector", "http"), Resource::new().attribute("port", 8080))
                    .child(("connector", "ajp"), Resource::new().attribute("port", 8009)),
            )
            .child(("subsystem", "mail"), Resource::new())
    }

    #[test]
    fn empty_registry_is_identity() {
        let source = sample();
        let out = transform_tree(&context(TransformerRegistry::empty(), source.clone())).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn runtime_and_remote_nodes_are_skipped() {
        let source = Resource::new()
            .child(("a", "1"), Resource::new().runtime_only())
            .child(("b", "2"), Resource::new().remote())
            .child(("c", "3"), Resource::new());
        let out = transform_tree(&context(TransformerRegistry::empty(), source)).unwrap();
        assert!(out.navigate(&addr("/a=1")).is_none());
        assert!(out.navigate(&addr("/b=2")).is_none());
        assert!(out.navigate(&addr("/c=3")).is_some());
    }

    #[test]
    fn discarded_subtree_is_omitted() {
        let registry = RegistryBuilder::new()
            .feature("web", Version::new(1, 0, 0), ResourceDescription::new().discard_child(("connector", "ajp")))
            .build()
            .unwrap();
        let out = transform_tree(&context(registry, sample())).unwrap();
        assert!(out.navigate(&addr("/subsystem=web/connector=http")).is_some());
        assert!(out.navigate(&addr("/subsystem=web/connector=ajp")).is_none());
    }

    #[test]
    fn renamed_parent_moves_children() {
        let registry = RegistryBuilder::new()
            .feature("web", Version::new(1, 0, 0), ResourceDescription::new().child(("connector", "*"), |d| d.rename_kind("listener")))
            .build()
            .unwrap();
        let out = transform_tree(&context(registry, sample())).unwrap();
        assert_eq!(
            out.navigate(&addr("/subsystem=web/listener=http")).and_then(|r| r.get_attribute("port")),
            Some(&json!(8080))
        );
        assert!(out.navigate(&addr("/subsystem=web/connector=http")).is_none());
    }

    #[test]
    fn collision_is_duplicate_resource() {
        let registry = RegistryBuilder::new()
            .feature("web", Version::new(1, 0, 0), ResourceDescription::new().child(("connector", "*"), |d| d.replace_segment(("connector", "only"))))
            .build()
            .unwrap();
        let err = transform_tree(&context(registry, sample())).unwrap_err();
        assert!(matches!(err, TransformError::DuplicateResource { .. }));
    }

    /// Inserts a group level above the segment
    #[derive(Debug)]
    struct Regroup;

    impl PathRewrite for Regroup {
        fn rewrite(&self, current: &Segment, builder: &mut AddressBuilder<'_>) -> Result<(), TransformError> {
            builder.next([Segment::new("group", "default"), current.clone()])
        }
    }

    #[test]
    fn moving_under_unwritten_parent_is_missing_ancestor() {
        let registry = RegistryBuilder::new()
            .feature(
                "web",
                Version::new(1, 0, 0),
                ResourceDescription::new().child(("connector", "http"), |d| d.path_rewrite(Regroup)),
            )
            .build()
            .unwrap();
        let err = transform_tree(&context(registry, sample())).unwrap_err();
        match err {
            TransformError::MissingAncestor { address } => {
                assert_eq!(address.to_string(), "/subsystem=web/group=default/connector=http");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ordered_children_may_not_change_type() {
        let source = Resource::new().child(
            ("chain", "main"),
            Resource::new()
                .ordered("filter")
                .child(("filter", "one"), Resource::new())
                .child(("filter", "two"), Resource::new()),
        );

        let renamed_type = RegistryBuilder::new()
            .core(
                PeerKind::Leaf,
                Version::new(1, 0, 0),
                ResourceDescription::new().child(("chain", "*"), |d| d.child(("filter", "*"), |f| f.rename_kind("step"))),
            )
            .build()
            .unwrap();
        let err = transform_tree(&context(renamed_type, source.clone())).unwrap_err();
        assert!(matches!(err, TransformError::OrderedChildRenamed { .. }));

        let renamed_only = RegistryBuilder::new()
            .core(
                PeerKind::Leaf,
                Version::new(1, 0, 0),
                ResourceDescription::new().child(("chain", "*"), |d| d.child(("filter", "one"), |f| f.replace_segment(("filter", "first")))),
            )
            .build()
            .unwrap();
        let out = transform_tree(&context(renamed_only, source)).unwrap();
        let chain = out.navigate(&addr("/chain=main")).unwrap();
        assert!(chain.is_ordered("filter"));
        let names: Vec<&str> = chain.children("filter").unwrap().names().collect();
        assert_eq!(names, vec!["first", "two"]);
    }

    #[test]
    fn replaced_does_not_recurse() {
        let registry = RegistryBuilder::new()
            .feature(
                "web",
                Version::new(1, 0, 0),
                ResourceDescription::new().transformer(ResourceFn::new(|_, resource: &Resource| {
                    Ok(Transformed::Replaced(resource.shallow_copy().attribute("flattened", true)))
                })),
            )
            .build()
            .unwrap();
        let out = transform_tree(&context(registry, sample())).unwrap();
        let web = out.navigate(&addr("/subsystem=web")).unwrap();
        assert_eq!(web.get_attribute("flattened"), Some(&json!(true)));
        assert!(web.children("connector").is_none());
    }

    #[test]
    fn transformer_sees_already_written_siblings() {
        let registry = RegistryBuilder::new()
            .feature(
                "web",
                Version::new(1, 0, 0),
                ResourceDescription::new().child(("connector", "ajp"), |d| {
                    d.transformer(ResourceFn::new(|scope: &NodeScope<'_>, resource: &Resource| {
                        let http_port = scope
                            .read_destination(&Address::single("connector", "http"))
                            .and_then(|r| r.get_attribute("port").cloned())
                            .unwrap_or_default();
                        Ok(Transformed::ReplacedAndRecurse(resource.shallow_copy().attribute("http-port", http_port)))
                    }))
                }),
            )
            .build()
            .unwrap();
        let out = transform_tree(&context(registry, sample())).unwrap();
        assert_eq!(
            out.navigate(&addr("/subsystem=web/connector=ajp")).and_then(|r| r.get_attribute("http-port")),
            Some(&json!(8080))
        );
    }

    #[test]
    fn depth_limit_is_enforced() {
        let target = TransformationTarget::builder("peer", PeerKind::Leaf, Version::default())
            .config(EngineConfig::default().with_max_tree_depth(1))
            .build();
        let source = Resource::new().child(("a", "1"), Resource::new().child(("b", "2"), Resource::new()));
        let ctx = TransformContext::new(Arc::new(target), Arc::new(source));
        assert!(matches!(transform_tree(&ctx), Err(TransformError::DepthExceeded { .. })));
    }

    #[test]
    fn subtree_translation_keeps_ancestors_empty() {
        let registry = RegistryBuilder::new()
            .feature("web", Version::new(1, 0, 0), ResourceDescription::new().replace_segment(("subsystem", "undertow")))
            .build()
            .unwrap();
        let ctx = context(registry, sample());
        let out = transform_subtree(&ctx, &addr("/subsystem=web/connector=http")).unwrap().unwrap();
        let web = out.navigate(&addr("/subsystem=undertow")).unwrap();
        assert!(web.attributes().is_empty());
        assert!(web.has_child(&("connector", "http").into()));
        assert!(transform_subtree(&ctx, &addr("/subsystem=none")).unwrap().is_none());
    }

    #[test]
    fn delta_chain_composes_in_order() {
        let chain = crate::chain::DeltaChain::builder("web", Version::new(3, 0, 0))
            .delta(
                Version::new(2, 0, 0),
                ResourceDescription::new().child(("connector", "*"), |d| d.rename_kind("listener")),
            )
            .delta(
                Version::new(1, 0, 0),
                ResourceDescription::new()
                    .replace_segment(("subsystem", "legacy-web"))
                    .discard_child(("listener", "ajp")),
            );
        let registry = RegistryBuilder::new().chained_feature(chain).build().unwrap();
        let out = transform_tree(&context(registry, sample())).unwrap();

        assert!(out.navigate(&addr("/subsystem=web")).is_none());
        assert_eq!(
            out.navigate(&addr("/subsystem=legacy-web/listener=http"))
                .and_then(|r| r.get_attribute("port")),
            Some(&json!(8080))
        );
        assert!(out.navigate(&addr("/subsystem=legacy-web/listener=ajp")).is_none());
        assert!(out.navigate(&addr("/subsystem=mail")).is_some());
    }

    #[test]
    fn later_delta_applies_below_a_moved_root() {
        let chain = crate::chain::DeltaChain::builder("web", Version::new(3, 0, 0))
            .delta(Version::new(2, 0, 0), ResourceDescription::new().replace_segment(("subsystem", "undertow")))
            .delta(
                Version::new(1, 0, 0),
                ResourceDescription::new()
                    .child(("connector", "*"), |d| d.rename_kind("listener"))
                    .discard_child(("connector", "ajp")),
            );
        let registry = RegistryBuilder::new().chained_feature(chain).build().unwrap();
        let ctx = context(registry, sample());

        let out = transform_tree(&ctx).unwrap();
        assert!(out.navigate(&addr("/subsystem=web")).is_none());
        assert!(out.navigate(&addr("/subsystem=undertow/connector=http")).is_none());
        assert_eq!(
            out.navigate(&addr("/subsystem=undertow/listener=http"))
                .and_then(|r| r.get_attribute("port")),
            Some(&json!(8080))
        );
        assert!(out.navigate(&addr("/subsystem=undertow/listener=ajp")).is_none());

        let subtree = transform_subtree(&ctx, &addr("/subsystem=web/connector=http")).unwrap().unwrap();
        assert!(subtree.navigate(&addr("/subsystem=undertow/listener=http")).is_some());
    }
}
