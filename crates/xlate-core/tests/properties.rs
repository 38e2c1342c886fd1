//! Property tests for translation invariants

use proptest::prelude::*;
use std::sync::Arc;
use xlate_core::{
    split_composite, transform_tree, FirstRejection, PathRewriteChain, PeerKind, RegistryBuilder, RejectSuccess,
    RejectionPolicy, ResourceDescription, TransformContext, TransformError, TransformationTarget, Verdict, AcceptAll,
};
use xlate_model::{Address, Command, Resource, Response, Segment, Version};
use xlate_test_utils::{addr, old_target, sample_context};

fn with_attributes(resource: Resource, attributes: Vec<(String, i64)>) -> Resource {
    attributes
        .into_iter()
        .fold(resource, |node, (name, value)| node.attribute(name, value))
}

fn attributes() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(("[a-c]", any::<i64>()), 0..3)
}

fn resource() -> impl Strategy<Value = Resource> {
    let leaf = attributes().prop_map(|attrs| with_attributes(Resource::new(), attrs));
    leaf.prop_recursive(3, 24, 3, |inner| {
        (attributes(), prop::collection::vec(("[a-c]", "[x-z]", inner), 0..3)).prop_map(|(attrs, children)| {
            children
                .into_iter()
                .fold(with_attributes(Resource::new(), attrs), |node, (kind, name, child)| {
                    node.child((kind, name), child)
                })
        })
    })
}

fn address() -> impl Strategy<Value = Address> {
    prop::collection::vec(("[a-d]", "[0-9a-z]{1,4}"), 1..6)
        .prop_map(|pairs| Address::new(pairs.into_iter().map(Segment::from).collect()))
}

fn empty_target() -> Arc<TransformationTarget> {
    Arc::new(TransformationTarget::builder("peer", PeerKind::Leaf, Version::new(1, 0, 0)).build())
}

proptest! {
    #[test]
    fn empty_registry_is_identity(tree in resource()) {
        let context = TransformContext::new(empty_target(), Arc::new(tree.clone()));
        prop_assert_eq!(transform_tree(&context).unwrap(), tree);
    }

    #[test]
    fn identity_chain_covers_every_segment(address in address()) {
        let chain = PathRewriteChain::identity(address.len());
        prop_assert_eq!(chain.rewrite(&address).unwrap(), address.clone());

        let short = PathRewriteChain::identity(address.len() - 1);
        let unclaimed = matches!(short.rewrite(&address), Err(TransformError::UnclaimedSegments { .. }));
        prop_assert!(unclaimed);
    }

    #[test]
    fn composite_indices_count_kept_steps(dropped in prop::collection::vec(any::<bool>(), 0..12)) {
        let registry = RegistryBuilder::new()
            .feature_default("gone", ResourceDescription::new().discard())
            .build()
            .unwrap();
        let target = TransformationTarget::builder("peer", PeerKind::Leaf, Version::new(1, 0, 0))
            .registry(Arc::new(registry))
            .build();
        let context = TransformContext::new(Arc::new(target), Arc::new(Resource::new()));

        let steps = dropped
            .iter()
            .enumerate()
            .map(|(i, &drop)| {
                let feature = if drop { "gone" } else { "kept" };
                Command::new("add", Address::single("subsystem", feature).child("item", i.to_string()))
            })
            .collect();
        let (outgoing, split) = split_composite(&context, &Command::composite(steps)).unwrap();

        let kept = dropped.iter().filter(|&&d| !d).count();
        prop_assert_eq!(outgoing.len(), kept);
        for (i, step) in split.steps().iter().enumerate() {
            prop_assert_eq!(step.original_index(), i);
            prop_assert_eq!(step.is_discarded(), dropped[i]);
            prop_assert_eq!(step.resulting_index(), dropped[..i].iter().filter(|&&d| !d).count());
        }

        let raw = (0..kept).fold(Response::success(), |r, i| r.step(format!("step-{i}"), Response::success()));
        prop_assert_eq!(split.rewrite(raw).steps.len(), dropped.len());
    }

    #[test]
    fn first_rejection_wins(rejects in prop::collection::vec(any::<bool>(), 0..8)) {
        let policies: Vec<Arc<dyn RejectionPolicy>> = rejects
            .iter()
            .enumerate()
            .map(|(i, &reject)| -> Arc<dyn RejectionPolicy> {
                if reject {
                    Arc::new(RejectSuccess::new(format!("policy {i}")))
                } else {
                    Arc::new(AcceptAll)
                }
            })
            .collect();
        let verdict = FirstRejection::new(policies).evaluate(&Response::success());

        match rejects.iter().position(|&r| r) {
            Some(first) => prop_assert_eq!(verdict, Verdict::reject(format!("policy {first}"))),
            None => prop_assert_eq!(verdict, Verdict::Accept),
        }
    }

    #[test]
    fn alias_and_canonical_translate_alike(name in "[a-z]{1,8}", level in "[A-Z]{1,6}") {
        let context = sample_context(old_target());
        let via_alias = Command::new("add", addr("/subsystem=logging").child("console", name.clone()))
            .param("level", level.clone());
        let direct = Command::new("add", addr("/subsystem=logging").child("handler", name))
            .param("level", level);

        let a = xlate_core::transform_command(&context, &via_alias).unwrap();
        let b = xlate_core::transform_command(&context, &direct).unwrap();
        prop_assert_eq!(a.command(), b.command());
        prop_assert_eq!(a.evaluate(&Response::success()), b.evaluate(&Response::success()));
    }
}
