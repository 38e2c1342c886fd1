//! Translation facade
//!
//! [`Translator`] bundles a target with the source model commands are
//! translated against.

use crate::command::{self, TransformedCommand};
use crate::context::TransformContext;
use crate::error::TransformError;
use crate::target::TransformationTarget;
use crate::tree;
use std::sync::Arc;
use xlate_model::{Address, Command, Resource, Response};

/// Translates trees, subtrees and commands for one peer
#[derive(Debug, Clone)]
pub struct Translator {
    context: TransformContext,
}

impl Translator {
    /// Translator with an empty source model
    #[must_use]
    pub fn new(target: Arc<TransformationTarget>) -> Self {
        Self {
            context: TransformContext::new(target, Arc::new(Resource::new())),
        }
    }

    /// Builder: read `source` when commands inspect the model
    #[must_use]
    pub fn with_source(mut self, source: Resource) -> Self {
        self.context = self.context.with_source(Arc::new(source));
        self
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &TransformContext {
        &self.context
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &TransformationTarget {
        self.context.target()
    }

    /// Translate the held source model
    ///
    /// # Errors
    /// See [`tree::transform_tree`]
    pub fn transform_tree(&self) -> Result<Resource, TransformError> {
        tree::transform_tree(&self.context)
    }

    /// Translate `resource` as the whole source model
    ///
    /// # Errors
    /// See [`tree::transform_tree`]
    pub fn transform_resource(&self, resource: &Resource) -> Result<Resource, TransformError> {
        tree::transform_tree(&self.context.with_source(Arc::new(resource.clone())))
    }

    /// Translate the held subtree at `address`
    ///
    /// # Errors
    /// See [`tree::transform_subtree`]
    pub fn transform_subtree(&self, address: &Address) -> Result<Option<Resource>, TransformError> {
        tree::transform_subtree(&self.context, address)
    }

    /// Translate `command`
    ///
    /// # Errors
    /// See [`command::transform_command`]
    pub fn transform_command(&self, command: &Command) -> Result<TransformedCommand, TransformError> {
        command::transform_command(&self.context, command)
    }

    /// Translate `command`, then map the peer's `raw` answer back
    ///
    /// A discarded command is answered with plain success without asking
    /// the peer.
    ///
    /// # Errors
    /// See [`command::transform_command`]
    pub fn round_trip(
        &self,
        command: &Command,
        execute: impl FnOnce(&Command) -> Response,
    ) -> Result<Response, TransformError> {
        let transformed = self.transform_command(command)?;
        let Some(outgoing) = transformed.command() else {
            return Ok(Response::success());
        };
        let raw = execute(outgoing);
        Ok(transformed.answer(raw))
    }
}
