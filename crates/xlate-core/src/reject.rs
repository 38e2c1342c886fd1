//! Rejection of unsupported value kinds
//!
//! Older peers may not understand some kinds of values, the usual case being
//! expressions like `${env.PORT:8080}`. [`RejectValueKind`] watches a set of
//! attributes and flags any value the peer cannot interpret.

use crate::command::{CommandScope, CommandTransformer, TransformedCommand};
use crate::context::{NodeScope, ResourceTransformer, Transformed};
use crate::error::TransformError;
use crate::policy::RejectSuccess;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use xlate_model::{Command, Resource};

/// Name of the single-attribute write command
pub const WRITE_ATTRIBUTE: &str = "write-attribute";

/// Decides whether a value is unsupported by the peer
pub trait ValueChecker: Send + Sync + fmt::Debug {
    fn is_unsupported(&self, value: &Value) -> bool;
}

/// Flags expression values, at any nesting depth
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionChecker;

impl ValueChecker for ExpressionChecker {
    fn is_unsupported(&self, value: &Value) -> bool {
        is_expression(value)
    }
}

/// Check if `value` holds an expression
///
/// Strings are scanned for `${...}`; arrays and objects are searched
/// recursively.
#[must_use]
pub fn is_expression(value: &Value) -> bool {
    match value {
        Value::String(text) => text
            .find("${")
            .is_some_and(|start| text[start + 2..].contains('}')),
        Value::Array(items) => items.iter().any(is_expression),
        Value::Object(fields) => fields.values().any(is_expression),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Watches attributes for value kinds the peer cannot interpret
///
/// As a command transformer it forwards the command unchanged but attaches
/// a policy that rejects a successful answer. As a resource transformer it
/// fails translation if the peer can report ignored resources, and only
/// logs a warning otherwise.
#[derive(Debug, Clone)]
pub struct RejectValueKind {
    attributes: Vec<String>,
    checkers: HashMap<String, Arc<dyn ValueChecker>>,
    default_checker: Arc<dyn ValueChecker>,
}

impl RejectValueKind {
    /// Reject expressions in `attributes`
    #[must_use]
    pub fn expressions<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
            checkers: HashMap::new(),
            default_checker: Arc::new(ExpressionChecker),
        }
    }

    /// Use `checker` for one attribute instead of the default
    #[must_use]
    pub fn with_checker(mut self, attribute: impl Into<String>, checker: impl ValueChecker + 'static) -> Self {
        self.checkers.insert(attribute.into(), Arc::new(checker));
        self
    }

    fn checker(&self, attribute: &str) -> &dyn ValueChecker {
        self.checkers
            .get(attribute)
            .map_or(self.default_checker.as_ref(), AsRef::as_ref)
    }

    /// Watched attributes holding unsupported values, in watch order
    #[must_use]
    pub fn violations(&self, document: &Map<String, Value>) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|name| {
                document
                    .get(name.as_str())
                    .is_some_and(|value| self.checker(name).is_unsupported(value))
            })
            .cloned()
            .collect()
    }

    fn command_violations(&self, command: &Command) -> Vec<String> {
        if command.name() == WRITE_ATTRIBUTE {
            let name = command.get_param("name").and_then(Value::as_str);
            let value = command.get_param("value");
            if let (Some(name), Some(value)) = (name, value) {
                let watched = self.attributes.iter().any(|a| a == name);
                return if watched && self.checker(name).is_unsupported(value) {
                    vec![name.to_string()]
                } else {
                    Vec::new()
                };
            }
        }
        self.violations(command.params())
    }
}

impl CommandTransformer for RejectValueKind {
    fn transform(&self, scope: &CommandScope<'_>, command: Command) -> Result<TransformedCommand, TransformError> {
        let violations = self.command_violations(&command);
        if violations.is_empty() {
            return Ok(TransformedCommand::pass_through(command));
        }

        let target = scope.target();
        let description = format!(
            "{} at {}: {} {} cannot interpret attributes {}",
            command.name(),
            scope.original_address(),
            target.name(),
            target.version(),
            violations.join(", "),
        );
        tracing::debug!("{}", description);
        Ok(TransformedCommand::pass_through(command).with_policy(RejectSuccess::new(description)))
    }
}

impl ResourceTransformer for RejectValueKind {
    fn transform(&self, scope: &NodeScope<'_>, resource: &Resource) -> Result<Transformed, TransformError> {
        let violations = self.violations(resource.attributes());
        if violations.is_empty() {
            return Ok(Transformed::ReplacedAndRecurse(resource.shallow_copy()));
        }

        let target = scope.target();
        if target.reports_ignored_resources() {
            return Err(TransformError::RejectedAttributes {
                address: scope.original_address().clone(),
                attributes: violations,
            });
        }

        tracing::warn!(
            "{}: {} {} cannot interpret attributes {}; sent unchanged",
            scope.original_address(),
            target.name(),
            target.version(),
            violations.join(", ")
        );
        Ok(Transformed::ReplacedAndRecurse(resource.shallow_copy()))
    }
}
