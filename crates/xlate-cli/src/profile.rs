//! Declarative translation profiles
//!
//! A profile is a TOML document describing one peer and the rules that
//! translate for it:
//!
//! ```toml
//! [target]
//! name = "leaf-1"
//! kind = "leaf"
//! version = "1.0.0"
//! features = { logging = "1.0.0" }
//!
//! [[feature]]
//! name = "logging"
//! version = "1.0.0"
//! rules = [
//!     { at = "/handler=*", action = "rename-type", to = "appender" },
//!     { at = "/filter=*", action = "discard" },
//! ]
//! ```
//!
//! Rule addresses are relative to the feature root (`/subsystem=<name>`),
//! or to the model root for `[[core]]` tables.

use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use xlate_core::{
    DeltaChain, EngineConfig, PeerKind, RegistryBuilder, RejectValueKind, ResourceDescription, StaticAlias,
    TransformError, TransformationTarget, TransformerRegistry,
};
use xlate_model::{Address, Segment, Version};

/// Profile loading errors
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid profile: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid rule at {at}: {reason}")]
    InvalidRule { at: Address, reason: String },

    #[error(transparent)]
    Registry(#[from] TransformError),
}

/// Whole profile document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    pub target: TargetSection,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default, rename = "core")]
    pub cores: Vec<CoreSection>,

    #[serde(default, rename = "feature")]
    pub features: Vec<FeatureSection>,

    #[serde(default, rename = "chain")]
    pub chains: Vec<ChainSection>,
}

/// The peer being translated for
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetSection {
    pub name: String,
    pub kind: PeerKind,
    pub version: Version,

    #[serde(default)]
    pub features: BTreeMap<String, Version>,

    #[serde(default)]
    pub exclude: Vec<Address>,

    #[serde(default)]
    pub reports_ignored_resources: bool,
}

/// Rules for the core model of one peer kind and version
#[derive(Debug, Clone, Deserialize)]
pub struct CoreSection {
    pub kind: PeerKind,
    pub version: Version,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Rules for one feature; without a version they apply to every version
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureSection {
    pub name: String,
    pub version: Option<Version>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// One-version deltas of a feature, newest first
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSection {
    pub feature: String,
    pub current: Version,
    #[serde(default, rename = "delta")]
    pub deltas: Vec<DeltaSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeltaSection {
    pub to: Version,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A rule applied to the resources at one relative address
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub at: Address,
    #[serde(flatten)]
    pub action: RuleAction,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RuleAction {
    /// Drop the resource, its subtree and its commands
    Discard,
    /// Drop children that have no rules of their own
    DiscardChildren,
    /// Keep the name, change the type
    RenameType { to: String },
    /// Replace the whole segment, given as `type=name`
    ReplaceSegment { to: String },
    /// Reject expressions in the listed attributes
    RejectExpressions { attributes: Vec<String> },
    /// Treat the address as an alias of `canonical`
    Alias { canonical: Address },
}

impl Profile {
    /// Parse a profile document
    ///
    /// # Errors
    /// Returns [`ProfileError::Parse`] on malformed TOML or unknown rules
    pub fn from_toml_str(text: &str) -> Result<Self, ProfileError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a profile file
    ///
    /// # Errors
    /// Returns [`ProfileError::Io`] if the file cannot be read
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Build the registry described by the rule tables
    ///
    /// # Errors
    /// Returns an error for malformed rules or conflicting registrations
    pub fn registry(&self) -> Result<TransformerRegistry, ProfileError> {
        let mut builder = RegistryBuilder::new();

        for core in &self.cores {
            builder = builder.core(core.kind, core.version, describe(&core.rules)?);
        }
        for feature in &self.features {
            let description = describe(&feature.rules)?;
            builder = match feature.version {
                Some(version) => builder.feature(feature.name.clone(), version, description),
                None => builder.feature_default(feature.name.clone(), description),
            };
        }
        for chain in &self.chains {
            let mut deltas = DeltaChain::builder(chain.feature.clone(), chain.current);
            for delta in &chain.deltas {
                deltas = deltas.delta(delta.to, describe(&delta.rules)?);
            }
            builder = builder.chained_feature(deltas);
        }

        let registry = builder.build()?;
        tracing::debug!("profile registry: {} patterns", registry.pattern_count());
        Ok(registry)
    }

    /// Build the target, registry included
    ///
    /// # Errors
    /// See [`Profile::registry`]
    pub fn target(&self) -> Result<TransformationTarget, ProfileError> {
        let section = &self.target;
        let mut builder = TransformationTarget::builder(section.name.clone(), section.kind, section.version)
            .reports_ignored_resources(section.reports_ignored_resources)
            .registry(Arc::new(self.registry()?))
            .config(self.engine.clone());
        for (feature, version) in &section.features {
            builder = builder.feature_version(feature.clone(), *version);
        }
        for pattern in &section.exclude {
            builder = builder.exclude(pattern.clone());
        }
        Ok(builder.build())
    }
}

/// Rules grouped by relative address
#[derive(Debug, Default)]
struct RuleNode {
    actions: Vec<RuleAction>,
    children: IndexMap<Segment, RuleNode>,
}

impl RuleNode {
    fn insert(&mut self, at: &Address, action: RuleAction) {
        let node = at
            .iter()
            .fold(self, |node, segment| node.children.entry(segment.clone()).or_default());
        node.actions.push(action);
    }

    fn into_description(self, at: &Address) -> Result<ResourceDescription, ProfileError> {
        let mut description = ResourceDescription::new();
        for action in self.actions {
            description = apply(description, at, action)?;
        }
        for (segment, child) in self.children {
            let child_at = at.append(segment.clone());
            let child = child.into_description(&child_at)?;
            description = description.child(segment, move |_| child);
        }
        Ok(description)
    }
}

fn describe(rules: &[Rule]) -> Result<ResourceDescription, ProfileError> {
    let mut root = RuleNode::default();
    for rule in rules {
        root.insert(&rule.at, rule.action.clone());
    }
    root.into_description(&Address::root())
}

fn apply(description: ResourceDescription, at: &Address, action: RuleAction) -> Result<ResourceDescription, ProfileError> {
    Ok(match action {
        RuleAction::Discard => description.discard(),
        RuleAction::DiscardChildren => description.discard_children_by_default(),
        RuleAction::RenameType { to } => description.rename_kind(to),
        RuleAction::ReplaceSegment { to } => {
            let segment = parse_segment(&to).ok_or_else(|| ProfileError::InvalidRule {
                at: at.clone(),
                reason: format!("expected type=name, got {to:?}"),
            })?;
            description.replace_segment(segment)
        }
        RuleAction::RejectExpressions { attributes } => {
            if attributes.is_empty() {
                return Err(ProfileError::InvalidRule {
                    at: at.clone(),
                    reason: "reject-expressions needs at least one attribute".to_string(),
                });
            }
            let reject = RejectValueKind::expressions(attributes);
            description.transformer(reject.clone()).default_command(reject, false)
        }
        RuleAction::Alias { canonical } => description.alias(StaticAlias::new(canonical)),
    })
}

fn parse_segment(text: &str) -> Option<Segment> {
    let address: Address = format!("/{text}").parse().ok()?;
    match address.segments() {
        [segment] => Some(segment.clone()),
        _ => None,
    }
}
