//! Chained version deltas
//!
//! A feature that changes across many versions can be described as a series
//! of small deltas, each translating one version to the one before it. A
//! target at version `V` then receives the composition of every delta from
//! the current version down to `V`.

use crate::error::TransformError;
use crate::registry::{Levels, RegistryTrie, ResourceDescription, Selector, FEATURE_TYPE};
use std::sync::Arc;
use xlate_model::{Address, Segment, Version};

pub(crate) const DELTA_SCOPE: &str = "delta";

/// One translation step between two adjacent versions
#[derive(Debug)]
pub struct DeltaStep {
    from: Version,
    to: Version,
    root: Segment,
    trie: RegistryTrie,
}

impl DeltaStep {
    /// Version this step translates from
    #[inline]
    #[must_use]
    pub fn from_version(&self) -> Version {
        self.from
    }

    /// Version this step translates to
    #[inline]
    #[must_use]
    pub fn to_version(&self) -> Version {
        self.to
    }

    pub(crate) fn levels(&self, address: &Address) -> Levels<'_> {
        self.trie
            .levels(DELTA_SCOPE, &self.feature_relative(address), Selector::Unversioned)
    }

    /// `address` with its first segment put back to the feature root
    ///
    /// Earlier deltas may have moved the root; this step's rules stay keyed
    /// at the root the feature was registered under.
    fn feature_relative(&self, address: &Address) -> Address {
        match address.first() {
            Some(first) if *first != self.root => Address::root()
                .append(self.root.clone())
                .append_address(&address.sub_address(1)),
            _ => address.clone(),
        }
    }
}

/// Ordered deltas from the current version down to one target version
#[derive(Debug)]
pub struct DeltaChain {
    feature: String,
    steps: Vec<Arc<DeltaStep>>,
}

impl DeltaChain {
    /// Start describing the deltas of `feature`, currently at `current`
    #[inline]
    #[must_use]
    pub fn builder(feature: impl Into<String>, current: Version) -> ChainedDeltaBuilder {
        ChainedDeltaBuilder {
            feature: feature.into(),
            current,
            deltas: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Address of the feature root
    #[inline]
    #[must_use]
    pub fn root(&self) -> Address {
        Address::single(FEATURE_TYPE, self.feature.as_str())
    }

    /// Steps in application order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[Arc<DeltaStep>] {
        &self.steps
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Version produced by the last step
    #[must_use]
    pub fn target_version(&self) -> Option<Version> {
        self.steps.last().map(|step| step.to)
    }
}

/// Collects deltas for one feature, newest first
#[derive(Debug)]
pub struct ChainedDeltaBuilder {
    feature: String,
    current: Version,
    deltas: Vec<(Version, ResourceDescription)>,
}

impl ChainedDeltaBuilder {
    /// Add the delta from the previous version down to `to`
    #[must_use]
    pub fn delta(mut self, to: Version, description: ResourceDescription) -> Self {
        self.deltas.push((to, description));
        self
    }

    #[inline]
    #[must_use]
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// One chain per described version, each a prefix of the full chain
    pub(crate) fn build(self) -> Result<Vec<(Version, Arc<DeltaChain>)>, TransformError> {
        if self.deltas.is_empty() {
            return Err(TransformError::InvalidRegistration(format!(
                "delta chain for {} has no deltas",
                self.feature
            )));
        }

        let root_segment = Segment::new(FEATURE_TYPE, self.feature.as_str());
        let root = Address::root().append(root_segment.clone());
        let mut from = self.current;
        let mut steps = Vec::with_capacity(self.deltas.len());
        for (to, description) in self.deltas {
            if to >= from {
                return Err(TransformError::InvalidRegistration(format!(
                    "delta chain for {} must descend: {from} -> {to}",
                    self.feature
                )));
            }

            let mut flat = Vec::new();
            description.flatten(&root, &mut flat);
            let mut trie = RegistryTrie::new();
            for (pattern, entry) in flat {
                trie.insert(DELTA_SCOPE, &pattern, None, None, entry)?;
            }
            steps.push(Arc::new(DeltaStep {
                from,
                to,
                root: root_segment.clone(),
                trie,
            }));
            from = to;
        }

        Ok((1..=steps.len())
            .map(|len| {
                let chain = DeltaChain {
                    feature: self.feature.clone(),
                    steps: steps[..len].to_vec(),
                };
                (steps[len - 1].to, Arc::new(chain))
            })
            .collect())
    }
}
