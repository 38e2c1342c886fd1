//! Testing utilities for the xlate workspace
//!
//! Shared fixtures: sample models, registries, targets and commands.

#![allow(missing_docs)]

use serde_json::json;
use std::sync::Arc;
use xlate_core::{
    DeltaChain, DiscardCommand, PeerKind, RegistryBuilder, RejectValueKind, ResourceDescription, StaticAlias,
    TransformContext, TransformationTarget, TransformerRegistry, Translator,
};
use xlate_model::{Address, Command, Resource, Version};

pub fn addr(text: &str) -> Address {
    text.parse().unwrap()
}

/// Model with a logging and a web subsystem
pub fn sample_tree() -> Resource {
    Resource::new()
        .attribute("name", "server-one")
        .child(
            ("subsystem", "logging"),
            Resource::new()
                .attribute("level", "INFO")
                .child(("handler", "console"), Resource::new().attribute("level", "DEBUG"))
                .child(("handler", "file"), Resource::new().attribute("path", "${log.dir}/server.log"))
                .child(("filter", "noisy"), Resource::new().attribute("pattern", ".*")),
        )
        .child(
            ("subsystem", "web"),
            Resource::new()
                .child(("connector", "http"), Resource::new().attribute("port", 8080))
                .child(("connector", "ajp"), Resource::new().attribute("port", 8009)),
        )
        .child(("subsystem", "metrics"), Resource::new().attribute("enabled", true))
        .child(("runtime", "stats"), Resource::new().runtime_only())
}

/// Registry covering the features of [`sample_tree`]
///
/// - logging 1.0.0: handlers become appenders, filters are dropped, `enable`
///   is discarded, expressions in `path` are rejected, `console=*` aliases
///   `handler=*`
/// - web: connectors become listeners at 2.0.0, then the subsystem becomes
///   `legacy-web` and `ajp` is dropped at 1.0.0
/// - metrics: discarded at every version
pub fn sample_registry() -> TransformerRegistry {
    let web = DeltaChain::builder("web", Version::new(3, 0, 0))
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

    RegistryBuilder::new()
        .feature(
            "logging",
            Version::new(1, 0, 0),
            ResourceDescription::new()
                .child(("handler", "*"), |d| {
                    let reject = RejectValueKind::expressions(["path"]);
                    d.rename_kind("appender")
                        .transformer(reject.clone())
                        .command("add", reject.clone())
                        .command("write-attribute", reject)
                        .command("enable", DiscardCommand)
                })
                .child(("console", "*"), |d| d.alias(StaticAlias::new(addr("/subsystem=logging/handler=*"))))
                .discard_child(("filter", "*")),
        )
        .feature_default("metrics", ResourceDescription::new().discard())
        .chained_feature(web)
        .build()
        .unwrap()
}

/// Target for a leaf peer running the given feature versions
pub fn leaf_target(logging: Version, web: Version) -> Arc<TransformationTarget> {
    Arc::new(
        TransformationTarget::builder("leaf-1", PeerKind::Leaf, Version::new(1, 0, 0))
            .feature_version("logging", logging)
            .feature_version("web", web)
            .registry(Arc::new(sample_registry()))
            .build(),
    )
}

/// Target on the oldest versions of every sample feature
pub fn old_target() -> Arc<TransformationTarget> {
    leaf_target(Version::new(1, 0, 0), Version::new(1, 0, 0))
}

/// Target on current versions, where nothing but discards apply
pub fn current_target() -> Arc<TransformationTarget> {
    leaf_target(Version::new(2, 0, 0), Version::new(3, 0, 0))
}

pub fn sample_context(target: Arc<TransformationTarget>) -> TransformContext {
    TransformContext::new(target, Arc::new(sample_tree()))
}

pub fn sample_translator(target: Arc<TransformationTarget>) -> Translator {
    Translator::new(target).with_source(sample_tree())
}

/// Composite touching every sample feature
///
/// Steps 0 and 3 are discarded for [`old_target`].
pub fn sample_composite() -> Command {
    Command::composite(vec![
        Command::new("add", addr("/subsystem=metrics")).param("enabled", true),
        Command::new("add", addr("/subsystem=logging/handler=h1")).param("level", "WARN"),
        Command::new("write-attribute", addr("/subsystem=web/connector=http"))
            .param("name", "port")
            .param("value", json!(8081)),
        Command::new("enable", addr("/subsystem=logging/handler=h1")),
        Command::new("add", addr("/subsystem=logging/handler=h2")).param("path", "${log.dir}/h2.log"),
    ])
}
