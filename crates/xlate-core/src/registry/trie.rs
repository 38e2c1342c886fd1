//! Frozen registration trie
//!
//! Keys are `scope:` followed by the escaped address pattern, e.g.
//! `leaf:/subsystem=logging/handler=*`. Each key maps to a [`VersionedNode`]
//! holding one entry per registered version plus an optional
//! version-independent fallback.

use crate::alias::AliasResolver;
use crate::chain::DeltaChain;
use crate::command::CommandTransformer;
use crate::context::ResourceTransformer;
use crate::error::TransformError;
use crate::path::{PassThrough, PathRewrite, PathRewriteChain};
use crate::target::TransformationTarget;
use radix_trie::{Trie, TrieCommon};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use xlate_model::{Address, Segment, Version};

use super::{CommandResolution, ResolvedEntry, TransformerEntry};

/// What happens to a resource node
#[derive(Debug, Clone)]
pub(crate) enum ResourceAction {
    PassThrough,
    Discard,
    Custom(Arc<dyn ResourceTransformer>),
    Placeholder(Arc<DeltaChain>),
}

/// Registration for one address pattern and one version
#[derive(Debug, Clone)]
pub(crate) struct NodeEntry {
    pub(crate) path: Arc<dyn PathRewrite>,
    pub(crate) action: ResourceAction,
    pub(crate) commands: HashMap<String, Arc<dyn CommandTransformer>>,
    pub(crate) default_command: Option<Arc<dyn CommandTransformer>>,
    pub(crate) inherit_default_command: bool,
    pub(crate) discard_children: bool,
    pub(crate) alias: Option<Arc<dyn AliasResolver>>,
}

impl Default for NodeEntry {
    fn default() -> Self {
        Self {
            path: Arc::new(PassThrough),
            action: ResourceAction::PassThrough,
            commands: HashMap::new(),
            default_command: None,
            inherit_default_command: false,
            discard_children: false,
            alias: None,
        }
    }
}

impl NodeEntry {
    fn is_discard(&self) -> bool {
        matches!(self.action, ResourceAction::Discard)
    }
}

/// All registrations for one address pattern
#[derive(Debug, Default)]
pub(crate) struct VersionedNode {
    feature: Option<String>,
    versions: BTreeMap<Version, NodeEntry>,
    fallback: Option<NodeEntry>,
}

/// How a node picks its entry
#[derive(Debug, Clone, Copy)]
pub(crate) enum Selector<'a> {
    /// Core or feature version of the target
    Target(&'a TransformationTarget),
    /// Version-independent entries only
    Unversioned,
}

impl VersionedNode {
    fn select(&self, selector: Selector<'_>) -> Option<&NodeEntry> {
        let specific = match selector {
            Selector::Target(target) => {
                let version = match &self.feature {
                    Some(feature) => target.feature_version(feature),
                    None => Some(target.version()),
                };
                version.and_then(|v| self.versions.get(&v))
            }
            Selector::Unversioned => None,
        };
        specific.or(self.fallback.as_ref())
    }
}

/// Radix trie of [`VersionedNode`]s
#[derive(Debug, Default)]
pub(crate) struct RegistryTrie {
    trie: Trie<String, VersionedNode>,
}

fn root_key(scope: &str) -> String {
    format!("{scope}:")
}

fn child_key(parent: &str, segment: &Segment) -> String {
    format!("{parent}/{segment}")
}

fn pattern_key(scope: &str, pattern: &Address) -> String {
    pattern
        .iter()
        .fold(root_key(scope), |key, segment| child_key(&key, segment))
}

impl RegistryTrie {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of registered address patterns
    pub(crate) fn len(&self) -> usize {
        self.trie.len()
    }

    /// Register `entry` at `pattern`; `version: None` registers the fallback
    pub(crate) fn insert(
        &mut self,
        scope: &str,
        pattern: &Address,
        feature: Option<&str>,
        version: Option<Version>,
        entry: NodeEntry,
    ) -> Result<(), TransformError> {
        let key = pattern_key(scope, pattern);
        let mut node = self.trie.remove(&key).unwrap_or_else(|| VersionedNode {
            feature: feature.map(str::to_string),
            ..VersionedNode::default()
        });

        if node.feature.as_deref() != feature {
            return Err(TransformError::InvalidRegistration(format!(
                "{pattern} registered both as {} and as {}",
                node.feature.as_deref().unwrap_or("core"),
                feature.unwrap_or("core"),
            )));
        }

        let occupied = match version {
            Some(version) => node.versions.insert(version, entry).is_some(),
            None => node.fallback.replace(entry).is_some(),
        };
        if occupied {
            return Err(TransformError::DuplicateRegistration {
                address: pattern.clone(),
                version: version.map_or_else(|| "default".to_string(), |v| v.to_string()),
            });
        }

        self.trie.insert(key, node);
        Ok(())
    }

    /// Entries along `address`, one per level starting at the root
    ///
    /// At each level an exact-name registration wins over a wildcard one.
    pub(crate) fn levels<'a>(&'a self, scope: &str, address: &Address, selector: Selector<'_>) -> Levels<'a> {
        let mut key = root_key(scope);
        let mut entries = Vec::with_capacity(address.len() + 1);
        entries.push(self.trie.get(&key).and_then(|node| node.select(selector)));

        for segment in address.iter() {
            let exact = child_key(&key, segment);
            let exact_entry = self.trie.get(&exact).and_then(|node| node.select(selector));
            if exact_entry.is_some() || segment.is_wildcard() {
                entries.push(exact_entry);
                key = exact;
                continue;
            }

            let wildcard = child_key(&key, &Segment::wildcard(segment.kind()));
            match self.trie.get(&wildcard).and_then(|node| node.select(selector)) {
                Some(entry) => {
                    entries.push(Some(entry));
                    key = wildcard;
                }
                None => {
                    entries.push(None);
                    key = exact;
                }
            }
        }

        Levels { entries }
    }
}

/// Selected entries along one address
#[derive(Debug)]
pub(crate) struct Levels<'a> {
    entries: Vec<Option<&'a NodeEntry>>,
}

impl<'a> Levels<'a> {
    fn leaf(&self) -> Option<&'a NodeEntry> {
        self.entries.last().copied().flatten()
    }

    fn ancestors(&self) -> &[Option<&'a NodeEntry>] {
        &self.entries[..self.entries.len().saturating_sub(1)]
    }

    fn ancestor_discarded(&self) -> bool {
        self.ancestors().iter().flatten().any(|entry| entry.is_discard())
    }

    fn nearest_ancestor(&self) -> Option<&'a NodeEntry> {
        self.ancestors().iter().rev().flatten().next().copied()
    }

    /// Entry governing the resource at the address
    pub(crate) fn resolved(&self) -> ResolvedEntry {
        if self.ancestor_discarded() {
            return ResolvedEntry::Discard;
        }
        if let Some(entry) = self.leaf() {
            return match &entry.action {
                ResourceAction::PassThrough => ResolvedEntry::PassThrough,
                ResourceAction::Discard => ResolvedEntry::Discard,
                ResourceAction::Custom(transformer) => ResolvedEntry::Custom(TransformerEntry::new(
                    Arc::clone(&entry.path),
                    Arc::clone(transformer),
                )),
                ResourceAction::Placeholder(chain) => ResolvedEntry::Placeholder(Arc::clone(chain)),
            };
        }
        if let Some(chain) = self.placeholder() {
            return ResolvedEntry::Placeholder(chain);
        }
        if self.nearest_ancestor().is_some_and(|entry| entry.discard_children) {
            return ResolvedEntry::Discard;
        }
        ResolvedEntry::NotRegistered
    }

    /// Deepest version-delta chain along the address
    fn placeholder(&self) -> Option<Arc<DeltaChain>> {
        self.entries.iter().flatten().rev().find_map(|entry| match &entry.action {
            ResourceAction::Placeholder(chain) => Some(Arc::clone(chain)),
            _ => None,
        })
    }

    /// One rule per address segment; identity where nothing is registered
    pub(crate) fn path_chain(&self) -> PathRewriteChain {
        let rules = self
            .entries
            .iter()
            .skip(1)
            .map(|entry| match entry {
                Some(entry) => Arc::clone(&entry.path),
                None => Arc::new(PassThrough) as Arc<dyn PathRewrite>,
            })
            .collect();
        PathRewriteChain::new(rules)
    }

    /// Command transformer for `name`
    pub(crate) fn command(&self, name: &str) -> CommandResolution {
        if matches!(self.resolved(), ResolvedEntry::Discard) {
            return CommandResolution::Discard;
        }

        if let Some(chain) = self.placeholder() {
            return CommandResolution::Placeholder(chain);
        }

        if let Some(entry) = self.leaf() {
            return entry
                .commands
                .get(name)
                .or(entry.default_command.as_ref())
                .map_or(CommandResolution::NotRegistered, |t| {
                    CommandResolution::Transformer(Arc::clone(t))
                });
        }

        self.ancestors()
            .iter()
            .rev()
            .flatten()
            .filter(|entry| entry.inherit_default_command)
            .find_map(|entry| entry.default_command.as_ref())
            .map_or(CommandResolution::NotRegistered, |t| {
                CommandResolution::Transformer(Arc::clone(t))
            })
    }

    /// Deepest alias registration: prefix length and resolver
    pub(crate) fn alias(&self) -> Option<(usize, &'a Arc<dyn AliasResolver>)> {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find_map(|(depth, entry)| entry.and_then(|e| e.alias.as_ref()).map(|alias| (depth, alias)))
    }
}
