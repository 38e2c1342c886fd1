//! Management commands
//!
//! A [`Command`] is a named request against one [`Address`]. The composite
//! command carries an ordered list of nested steps, each addressed on its own.

use crate::address::Address;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the multi-step command
pub const COMPOSITE: &str = "composite";

/// A named command against one address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    name: String,

    #[serde(default)]
    address: Address,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    params: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    steps: Vec<Command>,
}

impl Command {
    /// Create command without parameters
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            address,
            params: Map::new(),
            steps: Vec::new(),
        }
    }

    /// Composite command at the root holding `steps`
    #[inline]
    #[must_use]
    pub fn composite(steps: Vec<Command>) -> Self {
        Self {
            name: COMPOSITE.to_string(),
            address: Address::root(),
            params: Map::new(),
            steps,
        }
    }

    /// Builder: set a parameter
    #[inline]
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Command name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target address
    #[inline]
    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Parameter document
    #[inline]
    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Mutable parameter document
    #[inline]
    pub fn params_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.params
    }

    /// Single parameter
    #[inline]
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Nested steps of a composite
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[Command] {
        &self.steps
    }

    /// Check if this is the multi-step command
    #[inline]
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.name == COMPOSITE
    }

    /// Same command against another address
    #[inline]
    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Same command under another name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the nested steps
    #[inline]
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<Command>) -> Self {
        self.steps = steps;
        self
    }

    /// Replace the target address in place
    #[inline]
    pub fn set_address(&mut self, address: Address) {
        self.address = address;
    }
}
