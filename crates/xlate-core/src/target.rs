//! Transformation targets
//!
//! A [`TransformationTarget`] describes one peer: its kind, core version,
//! per-feature versions and capabilities. Feature versions may be learned
//! while the target is shared between sessions, so they live in a
//! concurrent map; the last writer wins.

use crate::attachment::Attachments;
use crate::config::EngineConfig;
use crate::registry::TransformerRegistry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use xlate_model::{Address, Version};

/// Role of a peer in the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerKind {
    /// Authoritative controller
    Central,

    /// Relay between controller and leaves
    Intermediate,

    /// Managed node
    Leaf,
}

impl PeerKind {
    /// All kinds
    pub const ALL: [PeerKind; 3] = [PeerKind::Central, PeerKind::Intermediate, PeerKind::Leaf];

    /// Registration scope name
    #[inline]
    #[must_use]
    pub fn scope(self) -> &'static str {
        match self {
            PeerKind::Central => "central",
            PeerKind::Intermediate => "intermediate",
            PeerKind::Leaf => "leaf",
        }
    }
}

impl fmt::Display for PeerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scope())
    }
}

/// One peer and everything translation needs to know about it
#[derive(Debug)]
pub struct TransformationTarget {
    name: String,
    kind: PeerKind,
    version: Version,
    feature_versions: DashMap<String, Version>,
    excluded: Vec<Address>,
    reports_ignored_resources: bool,
    registry: Arc<TransformerRegistry>,
    config: Arc<EngineConfig>,
    attachments: Attachments,
}

impl TransformationTarget {
    /// Start describing a target
    #[inline]
    #[must_use]
    pub fn builder(name: impl Into<String>, kind: PeerKind, version: Version) -> TargetBuilder {
        TargetBuilder {
            name: name.into(),
            kind,
            version,
            feature_versions: Vec::new(),
            excluded: Vec::new(),
            reports_ignored_resources: false,
            registry: None,
            config: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> PeerKind {
        self.kind
    }

    /// Core version
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Version of one feature, if known
    #[must_use]
    pub fn feature_version(&self, feature: &str) -> Option<Version> {
        self.feature_versions.get(feature).map(|v| *v)
    }

    /// Record a feature version, returning the one it replaced
    pub fn set_feature_version(&self, feature: impl Into<String>, version: Version) -> Option<Version> {
        let feature = feature.into();
        tracing::debug!("target {}: feature {} at version {}", self.name, feature, version);
        self.feature_versions.insert(feature, version)
    }

    /// Snapshot of all known feature versions
    #[must_use]
    pub fn feature_versions(&self) -> BTreeMap<String, Version> {
        self.feature_versions
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Check if the peer ignores the resource at `address`
    #[must_use]
    pub fn is_excluded(&self, address: &Address) -> bool {
        self.excluded.iter().any(|pattern| address.is_under(pattern))
    }

    /// Check if the peer can report resources it ignored
    #[inline]
    #[must_use]
    pub fn reports_ignored_resources(&self) -> bool {
        self.reports_ignored_resources
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<TransformerRegistry> {
        &self.registry
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ambient per-session data
    #[inline]
    #[must_use]
    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }
}

/// Builder for [`TransformationTarget`]
#[derive(Debug)]
pub struct TargetBuilder {
    name: String,
    kind: PeerKind,
    version: Version,
    feature_versions: Vec<(String, Version)>,
    excluded: Vec<Address>,
    reports_ignored_resources: bool,
    registry: Option<Arc<TransformerRegistry>>,
    config: Option<Arc<EngineConfig>>,
}

impl TargetBuilder {
    /// With feature version
    #[must_use]
    pub fn feature_version(mut self, feature: impl Into<String>, version: Version) -> Self {
        self.feature_versions.push((feature.into(), version));
        self
    }

    /// With an address pattern the peer ignores
    #[must_use]
    pub fn exclude(mut self, pattern: Address) -> Self {
        self.excluded.push(pattern);
        self
    }

    /// With ignored-resource reporting
    #[must_use]
    pub fn reports_ignored_resources(mut self, reports: bool) -> Self {
        self.reports_ignored_resources = reports;
        self
    }

    /// With registry; defaults to an empty one
    #[must_use]
    pub fn registry(mut self, registry: Arc<TransformerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// With engine configuration; defaults apply otherwise
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    /// Build target
    #[must_use]
    pub fn build(self) -> TransformationTarget {
        TransformationTarget {
            name: self.name,
            kind: self.kind,
            version: self.version,
            feature_versions: self.feature_versions.into_iter().collect(),
            excluded: self.excluded,
            reports_ignored_resources: self.reports_ignored_resources,
            registry: self.registry.unwrap_or_default(),
            config: self.config.unwrap_or_default(),
            attachments: Attachments::new(),
        }
    }
}
