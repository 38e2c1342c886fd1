//! Peer response documents
//!
//! A [`Response`] is what a peer returns after executing a command: an
//! outcome, an optional result, a failure description and, for composites,
//! one nested response per step keyed by step name.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Execution outcome reported by a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Applied successfully
    Success,

    /// Failed on the peer
    Failed,

    /// Deliberately skipped by the peer (e.g. excluded resource)
    Ignored,

    /// Rolled back or never run
    Cancelled,
}

/// Raw or rewritten response document
///
/// A response with nothing set is *undefined*; see [`Response::is_defined`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_description: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub steps: IndexMap<String, Response>,
}

impl Response {
    /// Undefined response
    #[inline]
    #[must_use]
    pub fn undefined() -> Self {
        Self::default()
    }

    /// Successful response without a result
    #[inline]
    #[must_use]
    pub fn success() -> Self {
        Self {
            outcome: Some(Outcome::Success),
            ..Self::default()
        }
    }

    /// Successful response carrying `result`
    #[inline]
    #[must_use]
    pub fn success_with(result: impl Into<Value>) -> Self {
        Self {
            outcome: Some(Outcome::Success),
            result: result.into(),
            ..Self::default()
        }
    }

    /// Failed response
    #[inline]
    #[must_use]
    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            outcome: Some(Outcome::Failed),
            failure_description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Response of a step the peer skipped
    #[inline]
    #[must_use]
    pub fn ignored() -> Self {
        Self {
            outcome: Some(Outcome::Ignored),
            ..Self::default()
        }
    }

    /// Builder: add a nested step response
    #[inline]
    #[must_use]
    pub fn step(mut self, key: impl Into<String>, response: Response) -> Self {
        self.steps.insert(key.into(), response);
        self
    }

    /// Check if anything is set
    #[inline]
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.outcome.is_some()
            || !self.result.is_null()
            || self.failure_description.is_some()
            || !self.steps.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == Some(Outcome::Success)
    }

    #[inline]
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.outcome == Some(Outcome::Ignored)
    }

    /// Nested step response
    #[inline]
    #[must_use]
    pub fn get_step(&self, key: &str) -> Option<&Response> {
        self.steps.get(key)
    }

    /// Mark as failed with `description`, keeping any result
    pub fn fail(&mut self, description: impl Into<String>) {
        self.outcome = Some(Outcome::Failed);
        self.failure_description = Some(description.into());
    }
}
