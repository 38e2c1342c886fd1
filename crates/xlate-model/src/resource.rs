//! Configuration tree nodes
//!
//! A [`Resource`] holds a document of named attributes and, per child type,
//! a [`Children`] collection of named sub-resources. The same type is used for
//! the read-only source tree and for the tree under construction.

use crate::address::{Address, Segment};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named children of one type
///
/// When `ordered` is set, insertion order is significant (e.g. an ordered
/// list of endpoints) and must survive translation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Children {
    #[serde(default, skip_serializing_if = "is_false")]
    ordered: bool,
    #[serde(default)]
    entries: IndexMap<String, Resource>,
}

impl Children {
    /// Check if insertion order is significant
    #[inline]
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Child by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.entries.get(name)
    }

    /// Child names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Children in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.entries.iter().map(|(name, r)| (name.as_str(), r))
    }

    /// Number of children
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no children
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One node of the configuration tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    attributes: Map<String, Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    children: IndexMap<String, Children>,

    /// Runtime-only nodes have no persistent configuration
    #[serde(default, skip_serializing_if = "is_false")]
    runtime_only: bool,

    /// Remote nodes are proxies for another process's tree
    #[serde(default, skip_serializing_if = "is_false")]
    remote: bool,
}

impl Resource {
    /// Create empty resource
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create resource holding `attributes`
    #[inline]
    #[must_use]
    pub fn with_attributes(attributes: Map<String, Value>) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    /// Builder: set an attribute
    #[inline]
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder: add a child
    #[inline]
    #[must_use]
    pub fn child(mut self, segment: impl Into<Segment>, child: Resource) -> Self {
        self.insert_child(segment.into(), child);
        self
    }

    /// Builder: mark the `kind` collection as order-preserving
    #[inline]
    #[must_use]
    pub fn ordered(mut self, kind: impl Into<String>) -> Self {
        self.set_ordered(kind, true);
        self
    }

    /// Builder: mark as runtime-only
    #[inline]
    #[must_use]
    pub fn runtime_only(mut self) -> Self {
        self.runtime_only = true;
        self
    }

    /// Builder: mark as a remote proxy
    #[inline]
    #[must_use]
    pub fn remote(mut self) -> Self {
        self.remote = true;
        self
    }

    /// Attribute document
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Mutable attribute document
    #[inline]
    pub fn attributes_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.attributes
    }

    /// Single attribute
    #[inline]
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Replace the attribute document, keeping children and flags
    #[inline]
    pub fn set_attributes(&mut self, attributes: Map<String, Value>) {
        self.attributes = attributes;
    }

    #[inline]
    #[must_use]
    pub fn is_runtime_only(&self) -> bool {
        self.runtime_only
    }

    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// Copy of attributes and flags without any children
    #[must_use]
    pub fn shallow_copy(&self) -> Self {
        Self {
            attributes: self.attributes.clone(),
            children: IndexMap::new(),
            runtime_only: self.runtime_only,
            remote: self.remote,
        }
    }

    /// Drop all children, keeping attributes and flags
    #[must_use]
    pub fn without_children(mut self) -> Self {
        self.children.clear();
        self
    }

    /// Child types in insertion order
    pub fn child_types(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Collection for one child type
    #[inline]
    #[must_use]
    pub fn children(&self, kind: &str) -> Option<&Children> {
        self.children.get(kind)
    }

    /// All children, grouped by type, in insertion order
    pub fn iter_children(&self) -> impl Iterator<Item = (Segment, &Resource)> {
        self.children.iter().flat_map(|(kind, collection)| {
            collection
                .entries
                .iter()
                .map(move |(name, child)| (Segment::new(kind.as_str(), name.as_str()), child))
        })
    }

    /// Check if the `kind` collection is order-preserving
    #[inline]
    #[must_use]
    pub fn is_ordered(&self, kind: &str) -> bool {
        self.children.get(kind).is_some_and(Children::is_ordered)
    }

    /// Set the order-preserving flag of the `kind` collection
    pub fn set_ordered(&mut self, kind: impl Into<String>, ordered: bool) {
        self.children.entry(kind.into()).or_default().ordered = ordered;
    }

    /// Direct child
    #[inline]
    #[must_use]
    pub fn get_child(&self, segment: &Segment) -> Option<&Resource> {
        self.children.get(segment.kind())?.entries.get(segment.name())
    }

    /// Mutable direct child
    #[inline]
    pub fn get_child_mut(&mut self, segment: &Segment) -> Option<&mut Resource> {
        self.children
            .get_mut(segment.kind())?
            .entries
            .get_mut(segment.name())
    }

    /// Check if a direct child exists
    #[inline]
    #[must_use]
    pub fn has_child(&self, segment: &Segment) -> bool {
        self.get_child(segment).is_some()
    }

    /// Insert or replace a direct child, returning the previous one
    pub fn insert_child(&mut self, segment: Segment, child: Resource) -> Option<Resource> {
        let (kind, name) = (segment.kind().to_string(), segment.name().to_string());
        self.children.entry(kind).or_default().entries.insert(name, child)
    }

    /// Remove a direct child, keeping the order of its siblings
    pub fn remove_child(&mut self, segment: &Segment) -> Option<Resource> {
        let collection = self.children.get_mut(segment.kind())?;
        let removed = collection.entries.shift_remove(segment.name());
        if collection.entries.is_empty() && !collection.ordered {
            self.children.shift_remove(segment.kind());
        }
        removed
    }

    /// Node at `address` relative to this one
    #[must_use]
    pub fn navigate(&self, address: &Address) -> Option<&Resource> {
        address
            .iter()
            .try_fold(self, |node, segment| node.get_child(segment))
    }

    /// Mutable node at `address` relative to this one
    pub fn navigate_mut(&mut self, address: &Address) -> Option<&mut Resource> {
        let mut node = self;
        for segment in address.iter() {
            node = node.get_child_mut(segment)?;
        }
        Some(node)
    }

    /// Detach the subtree at `address` from its parent
    ///
    /// Siblings keep their relative order. The root cannot be detached.
    pub fn remove_at(&mut self, address: &Address) -> Option<Resource> {
        let parent = address.parent()?;
        let last = address.last()?;
        self.navigate_mut(&parent)?.remove_child(last)
    }

    /// Tree whose only path leads through empty ancestors to `leaf` at `address`
    #[must_use]
    pub fn skeleton(address: &Address, leaf: Resource) -> Self {
        address
            .segments()
            .iter()
            .rev()
            .fold(leaf, |node, segment| Resource::new().child(segment.clone(), node))
    }

    /// Total number of nodes in this subtree, including `self`
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .iter_children()
            .map(|(_, child)| child.node_count())
            .sum::<usize>()
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}
