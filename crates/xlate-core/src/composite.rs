//! Composite command translation
//!
//! Steps of a composite are translated one by one. Discarded steps disappear
//! from the outgoing composite, so the peer numbers the remaining steps
//! differently than the sender did. [`CompositeSplit`] keeps both numberings
//! and uses them to judge and rewrite the peer's combined answer.

use crate::command::{transform_command, TransformedCommand};
use crate::context::TransformContext;
use crate::error::TransformError;
use crate::policy::{RejectionPolicy, ResponseRewriter, Verdict};
use std::fmt;
use std::sync::Arc;
use xlate_model::{Command, Response};

/// Translation record of one composite step
#[derive(Debug, Clone)]
pub struct CompositeStep {
    original_index: usize,
    resulting_index: usize,
    transformed: TransformedCommand,
}

impl CompositeStep {
    /// Position in the sender's composite
    #[inline]
    #[must_use]
    pub fn original_index(&self) -> usize {
        self.original_index
    }

    /// Position in the outgoing composite
    ///
    /// For a discarded step this is the number of kept steps before it.
    #[inline]
    #[must_use]
    pub fn resulting_index(&self) -> usize {
        self.resulting_index
    }

    #[inline]
    #[must_use]
    pub fn is_discarded(&self) -> bool {
        self.transformed.is_discarded()
    }

    #[inline]
    #[must_use]
    pub fn transformed(&self) -> &TransformedCommand {
        &self.transformed
    }
}

impl fmt::Display for CompositeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_discarded() {
            write!(f, "step {} (discarded)", self.original_index)
        } else {
            write!(f, "step {} -> {}", self.original_index, self.resulting_index)
        }
    }
}

/// Index mapping between a sender's composite and the outgoing one
#[derive(Debug)]
pub struct CompositeSplit {
    steps: Vec<CompositeStep>,
    key_prefix: String,
}

impl CompositeSplit {
    /// Steps in original order
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[CompositeStep] {
        &self.steps
    }

    fn key(&self, index: usize) -> String {
        format!("{}{index}", self.key_prefix)
    }

    /// First kept step whose own policy rejects its raw result
    ///
    /// Steps the peer reports as ignored are never rejected.
    #[must_use]
    pub fn first_rejection(&self, raw: &Response) -> Option<(usize, String)> {
        let undefined = Response::undefined();
        self.steps
            .iter()
            .filter(|step| !step.is_discarded())
            .find_map(|step| {
                let result = raw.get_step(&self.key(step.resulting_index)).unwrap_or(&undefined);
                if result.is_ignored() {
                    return None;
                }
                match step.transformed.evaluate(result) {
                    Verdict::Reject { description } => Some((step.original_index, description)),
                    Verdict::Accept => None,
                }
            })
    }

    /// Combined answer keyed by the sender's step numbering
    #[must_use]
    pub fn rewrite(&self, raw: Response) -> Response {
        let rejection = self.first_rejection(&raw);
        // keys the split does not own are passed back as the peer sent them
        let mut steps = raw.steps.clone();

        for step in &self.steps {
            let original_key = self.key(step.original_index);
            if step.is_discarded() {
                steps.insert(original_key, Response::success());
                continue;
            }

            let mut result = raw
                .get_step(&self.key(step.resulting_index))
                .cloned()
                .unwrap_or_default();
            if let Some((index, description)) = &rejection {
                if *index == step.original_index {
                    result.fail(description.clone());
                }
            }

            let rewritten = step.transformed.rewrite_response(result);
            if rewritten.is_defined() || raw.steps.contains_key(&original_key) {
                steps.insert(original_key, rewritten);
            }
        }

        Response {
            outcome: raw.outcome,
            result: raw.result,
            failure_description: raw.failure_description,
            steps,
        }
    }
}

#[derive(Debug)]
struct CompositeRewriter(Arc<CompositeSplit>);

impl ResponseRewriter for CompositeRewriter {
    fn rewrite(&self, response: Response) -> Response {
        self.0.rewrite(response)
    }
}

#[derive(Debug)]
struct CompositePolicy(Arc<CompositeSplit>);

impl RejectionPolicy for CompositePolicy {
    fn evaluate(&self, response: &Response) -> Verdict {
        self.0
            .first_rejection(response)
            .map_or(Verdict::Accept, |(_, description)| Verdict::reject(description))
    }
}

/// Translate every step, keeping the index mapping
///
/// # Errors
/// Returns the first error raised by any step
pub fn split_composite(context: &TransformContext, command: &Command) -> Result<(Vec<Command>, CompositeSplit), TransformError> {
    let mut outgoing = Vec::with_capacity(command.steps().len());
    let mut steps = Vec::with_capacity(command.steps().len());

    for (original_index, step) in command.steps().iter().enumerate() {
        // nested root composites recurse through transform_command
        let transformed = transform_command(context, step)?;
        let resulting_index = outgoing.len();
        if let Some(kept) = transformed.command() {
            outgoing.push(kept.clone());
        }
        let record = CompositeStep {
            original_index,
            resulting_index,
            transformed,
        };
        tracing::trace!("composite {}", record);
        steps.push(record);
    }

    let split = CompositeSplit {
        steps,
        key_prefix: context.target().config().step_key_prefix.clone(),
    };
    Ok((outgoing, split))
}

pub(crate) fn transform_composite(context: &TransformContext, command: &Command) -> Result<TransformedCommand, TransformError> {
    let (outgoing, split) = split_composite(context, command)?;
    tracing::debug!(
        "composite: {} of {} steps kept",
        outgoing.len(),
        split.steps().len()
    );

    let split = Arc::new(split);
    Ok(TransformedCommand::new(
        Some(command.clone().with_steps(outgoing)),
        Arc::new(CompositeRewriter(Arc::clone(&split))),
        Arc::new(CompositePolicy(split)),
    ))
}
