//! Command translation
//!
//! A command is canonicalized (aliases replaced), resolved against the
//! registry, given its rewritten address and handed to the registered
//! [`CommandTransformer`]. The result is a [`TransformedCommand`]: the
//! command to send (or none, if discarded) plus the callbacks that judge and
//! rewrite the peer's answer.

use crate::alias::AliasContext;
use crate::chain::DeltaChain;
use crate::composite;
use crate::context::TransformContext;
use crate::error::TransformError;
use crate::policy::{
    AcceptAll, FirstRejection, IdentityRewriter, RejectionPolicy, ResponseRewriter, RewriterChain, Verdict,
};
use crate::registry::CommandResolution;
use crate::target::TransformationTarget;
use crate::tree;
use std::fmt;
use std::sync::Arc;
use xlate_model::{Address, Command, Resource, Response};

/// Translated command and the callbacks for its response
#[derive(Debug, Clone)]
pub struct TransformedCommand {
    command: Option<Command>,
    rewriter: Arc<dyn ResponseRewriter>,
    policy: Arc<dyn RejectionPolicy>,
}

impl TransformedCommand {
    #[inline]
    #[must_use]
    pub fn new(command: Option<Command>, rewriter: Arc<dyn ResponseRewriter>, policy: Arc<dyn RejectionPolicy>) -> Self {
        Self {
            command,
            rewriter,
            policy,
        }
    }

    /// Forward `command`, accept any answer, return it unchanged
    #[must_use]
    pub fn pass_through(command: Command) -> Self {
        Self::new(Some(command), Arc::new(IdentityRewriter), Arc::new(AcceptAll))
    }

    /// Send nothing
    #[must_use]
    pub fn discard() -> Self {
        Self::new(None, Arc::new(IdentityRewriter), Arc::new(AcceptAll))
    }

    /// With response rewriter
    #[must_use]
    pub fn with_rewriter(mut self, rewriter: impl ResponseRewriter + 'static) -> Self {
        self.rewriter = Arc::new(rewriter);
        self
    }

    /// With rejection policy
    #[must_use]
    pub fn with_policy(mut self, policy: impl RejectionPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Command to send, unless discarded
    #[inline]
    #[must_use]
    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn into_command(self) -> Option<Command> {
        self.command
    }

    #[inline]
    #[must_use]
    pub fn is_discarded(&self) -> bool {
        self.command.is_none()
    }

    #[inline]
    #[must_use]
    pub fn rewriter(&self) -> &Arc<dyn ResponseRewriter> {
        &self.rewriter
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> &Arc<dyn RejectionPolicy> {
        &self.policy
    }

    /// Judge the raw response
    #[inline]
    #[must_use]
    pub fn evaluate(&self, response: &Response) -> Verdict {
        self.policy.evaluate(response)
    }

    /// Rewrite the raw response for the sender
    #[inline]
    #[must_use]
    pub fn rewrite_response(&self, response: Response) -> Response {
        self.rewriter.rewrite(response)
    }

    /// Judge then rewrite the raw response
    ///
    /// A rejected response is marked failed with the rejection description
    /// after rewriting.
    #[must_use]
    pub fn answer(&self, raw: Response) -> Response {
        let verdict = self.evaluate(&raw);
        let mut answer = self.rewrite_response(raw);
        if let Verdict::Reject { description } = verdict {
            tracing::debug!("response rejected: {}", description);
            answer.fail(description);
        }
        answer
    }
}

/// What a command transformer can see besides the command
#[derive(Debug)]
pub struct CommandScope<'a> {
    context: &'a TransformContext,
    original: &'a Address,
}

impl<'a> CommandScope<'a> {
    pub(crate) fn new(context: &'a TransformContext, original: &'a Address) -> Self {
        Self { context, original }
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &'a TransformContext {
        self.context
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &'a TransformationTarget {
        self.context.target()
    }

    /// Canonical address before rewriting
    #[inline]
    #[must_use]
    pub fn original_address(&self) -> &'a Address {
        self.original
    }

    /// Source node at an absolute address
    #[inline]
    #[must_use]
    pub fn read_source(&self, address: &Address) -> Option<&'a Resource> {
        self.context.read_source(address)
    }
}

/// Translates one command
///
/// The command handed in already carries its rewritten address.
pub trait CommandTransformer: Send + Sync + fmt::Debug {
    /// Produce the command the peer should see
    ///
    /// # Errors
    /// Returns error if the command cannot be translated at all
    fn transform(&self, scope: &CommandScope<'_>, command: Command) -> Result<TransformedCommand, TransformError>;
}

/// Drops the command; the sender sees a success
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardCommand;

impl CommandTransformer for DiscardCommand {
    fn transform(&self, _scope: &CommandScope<'_>, _command: Command) -> Result<TransformedCommand, TransformError> {
        Ok(TransformedCommand::discard())
    }
}

/// Command transformer backed by a closure
pub struct CommandFn<F> {
    transform: F,
}

impl<F> CommandFn<F>
where
    F: Fn(&CommandScope<'_>, Command) -> Result<TransformedCommand, TransformError> + Send + Sync,
{
    #[inline]
    #[must_use]
    pub fn new(transform: F) -> Self {
        Self { transform }
    }
}

impl<F> fmt::Debug for CommandFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CommandFn")
    }
}

impl<F> CommandTransformer for CommandFn<F>
where
    F: Fn(&CommandScope<'_>, Command) -> Result<TransformedCommand, TransformError> + Send + Sync,
{
    fn transform(&self, scope: &CommandScope<'_>, command: Command) -> Result<TransformedCommand, TransformError> {
        (self.transform)(scope, command)
    }
}

/// Translate `command` for the target of `context`
///
/// # Errors
/// Returns error on alias cycles, unclaimed path segments or transformer
/// failures
pub fn transform_command(context: &TransformContext, command: &Command) -> Result<TransformedCommand, TransformError> {
    if command.is_composite() && command.address().is_empty() {
        return composite::transform_composite(context, command);
    }

    let canonical = context.canonical_address(command.address(), AliasContext::Command(command))?;
    transform_at(context, &canonical, command)
}

/// Translate `command` as if it were addressed to `canonical`
pub(crate) fn transform_at(
    context: &TransformContext,
    canonical: &Address,
    command: &Command,
) -> Result<TransformedCommand, TransformError> {
    if context.target().is_excluded(canonical) {
        tracing::debug!("discarding {} at {}: ignored by {}", command.name(), canonical, context.target().name());
        return Ok(TransformedCommand::discard());
    }

    let transformer = match context.command_transformer(canonical, command.name()) {
        CommandResolution::Discard => {
            tracing::debug!("discarding {} at {}", command.name(), canonical);
            return Ok(TransformedCommand::discard());
        }
        CommandResolution::Placeholder(chain) => return transform_chained(context, &chain, canonical, command),
        CommandResolution::Transformer(transformer) => Some(transformer),
        CommandResolution::NotRegistered => None,
    };

    let rewritten = context.rewrite_address(canonical)?;
    let outgoing = command.clone().with_address(rewritten);

    match transformer {
        Some(transformer) => transformer.transform(&CommandScope::new(context, canonical), outgoing),
        None => Ok(TransformedCommand::pass_through(outgoing)),
    }
}

/// Run a command through every delta of `chain`
///
/// Each delta after the first reads the source model as translated by the
/// deltas before it. Response rewriters compose in reverse order; the first
/// rejecting policy wins.
fn transform_chained(
    context: &TransformContext,
    chain: &DeltaChain,
    canonical: &Address,
    command: &Command,
) -> Result<TransformedCommand, TransformError> {
    let mut outgoing = command.clone().with_address(canonical.clone());
    let mut root = chain.root();
    let mut previous: Option<TransformContext> = None;
    let mut rewriters = Vec::with_capacity(chain.len());
    let mut policies = Vec::with_capacity(chain.len());

    for step in chain.steps() {
        let step_context = match &previous {
            None => context.with_placeholder(Arc::clone(step)),
            Some(prior) => {
                let produced = tree::transform_subtree(prior, &root)?;
                root = prior.rewrite_address(&root)?;
                let reseeded = match produced {
                    Some(source) => prior.reseeded_from(source)?,
                    None => prior.clone(),
                };
                reseeded.with_placeholder(Arc::clone(step))
            }
        };

        let translated = transform_command(&step_context, &outgoing)?;
        rewriters.push(Arc::clone(translated.rewriter()));
        policies.push(Arc::clone(translated.policy()));
        let Some(next) = translated.into_command() else {
            tracing::debug!("{} at {} dropped by delta to {}", command.name(), canonical, step.to_version());
            return Ok(TransformedCommand::discard());
        };
        outgoing = next;
        previous = Some(step_context);
    }

    rewriters.reverse();
    Ok(TransformedCommand::new(
        Some(outgoing),
        Arc::new(RewriterChain::new(rewriters)),
        Arc::new(FirstRejection::new(policies)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::DeltaChain;
    use crate::policy::{FnRewriter, RejectSuccess};
    use crate::registry::{RegistryBuilder, ResourceDescription, TransformerRegistry};
    use crate::target::PeerKind;
    use serde_json::json;
    use xlate_model::Version;

    fn addr(text: &str) -> Address {
        text.parse().unwrap()
    }

    fn context(registry: TransformerRegistry) -> TransformContext {
        let target = TransformationTarget::builder("peer", PeerKind::Leaf, Version::new(1, 0, 0))
            .feature_version("web", Version::new(1, 0, 0))
            .exclude(addr("/subsystem=ignored"))
            .registry(Arc::new(registry))
            .build();
        let source = Resource::new().child(
            ("subsystem", "web"),
            Resource::new().child(("connector", "http"), Resource::new().attribute("port", 8080)),
        );
        TransformContext::new(Arc::new(target), Arc::new(source))
    }

    #[test]
    fn unregistered_command_passes_through() {
        let command = Command::new("add", addr("/a=1")).param("x", 1);
        let out = transform_command(&context(TransformerRegistry::empty()), &command).unwrap();
        assert_eq!(out.command(), Some(&command));
        assert_eq!(out.evaluate(&Response::success()), Verdict::Accept);
        assert_eq!(out.rewrite_response(Response::success()), Response::success());
    }

    #[test]
    fn excluded_address_is_discarded() {
        let command = Command::new("add", addr("/subsystem=ignored/x=1"));
        assert!(transform_command(&context(TransformerRegistry::empty()), &command)
            .unwrap()
            .is_discarded());
    }

    #[test]
    fn registered_transformer_gets_rewritten_address() {
        let registry = RegistryBuilder::new()
            .feature(
                "web",
                Version::new(1, 0, 0),
                ResourceDescription::new().child(("connector", "*"), |d| {
                    d.rename_kind("listener").command(
                        "write-attribute",
                        CommandFn::new(|scope: &CommandScope<'_>, command: Command| {
                            assert_eq!(scope.original_address().to_string(), "/subsystem=web/connector=http");
                            assert!(scope.read_source(scope.original_address()).is_some());
                            Ok(TransformedCommand::pass_through(command.param("legacy", true)))
                        }),
                    )
                }),
            )
            .build()
            .unwrap();

        let command = Command::new("write-attribute", addr("/subsystem=web/connector=http"));
        let out = transform_command(&context(registry), &command).unwrap();
        let sent = out.command().unwrap();
        assert_eq!(sent.address().to_string(), "/subsystem=web/listener=http");
        assert_eq!(sent.get_param("legacy"), Some(&json!(true)));
    }

    #[test]
    fn chained_deltas_compose_command_and_response() {
        let chain = DeltaChain::builder("web", Version::new(3, 0, 0))
            .delta(
                Version::new(2, 0, 0),
                ResourceDescription::new().child(("connector", "*"), |d| {
                    d.rename_kind("listener").command(
                        "add",
                        CommandFn::new(|_: &CommandScope<'_>, command: Command| {
                            Ok(TransformedCommand::pass_through(command)
                                .with_rewriter(FnRewriter::new(|mut r: Response| {
                                    r.result = json!(format!("{}+v3", r.result.as_str().unwrap_or("")));
                                    r
                                }))
                                .with_policy(RejectSuccess::new("newest delta")))
                        }),
                    )
                }),
            )
            .delta(
                Version::new(1, 0, 0),
                ResourceDescription::new().child(("listener", "*"), |d| {
                    d.command(
                        "add",
                        CommandFn::new(|scope: &CommandScope<'_>, command: Command| {
                            // reads the model as the previous delta wrote it
                            assert!(scope.read_source(scope.original_address()).is_some());
                            Ok(TransformedCommand::pass_through(command)
                                .with_rewriter(FnRewriter::new(|mut r: Response| {
                                    r.result = json!(format!("{}+v2", r.result.as_str().unwrap_or("")));
                                    r
                                }))
                                .with_policy(RejectSuccess::new("oldest delta")))
                        }),
                    )
                }),
            );
        let registry = RegistryBuilder::new().chained_feature(chain).build().unwrap();

        let command = Command::new("add", addr("/subsystem=web/connector=http"));
        let out = transform_command(&context(registry), &command).unwrap();
        assert_eq!(
            out.command().unwrap().address().to_string(),
            "/subsystem=web/listener=http"
        );

        let rewritten = out.rewrite_response(Response::success_with(json!("raw")));
        assert_eq!(rewritten.result, json!("raw+v2+v3"));
        assert_eq!(out.evaluate(&Response::success()).description(), Some("newest delta"));
    }

    #[test]
    fn later_delta_command_rules_follow_a_moved_root() {
        let chain = DeltaChain::builder("web", Version::new(3, 0, 0))
            .delta(Version::new(2, 0, 0), ResourceDescription::new().replace_segment(("subsystem", "undertow")))
            .delta(
                Version::new(1, 0, 0),
                ResourceDescription::new().child(("connector", "*"), |d| {
                    d.rename_kind("listener")
                        .command("remove", DiscardCommand)
                }),
            );
        let registry = RegistryBuilder::new().chained_feature(chain).build().unwrap();
        let ctx = context(registry);

        let add = Command::new("add", addr("/subsystem=web/connector=http"));
        let out = transform_command(&ctx, &add).unwrap();
        assert_eq!(
            out.command().unwrap().address().to_string(),
            "/subsystem=undertow/listener=http"
        );

        let remove = Command::new("remove", addr("/subsystem=web/connector=http"));
        assert!(transform_command(&ctx, &remove).unwrap().command().is_none());
    }

    /// Claims the feature root and never hands on the rest
    #[derive(Debug)]
    struct Truncate;

    impl crate::path::PathRewrite for Truncate {
        fn rewrite(
            &self,
            _current: &xlate_model::Segment,
            _builder: &mut crate::path::AddressBuilder<'_>,
        ) -> Result<(), TransformError> {
            Ok(())
        }
    }

    #[test]
    fn unclaimed_segments_surface_unwrapped() {
        let registry = RegistryBuilder::new()
            .feature("web", Version::new(1, 0, 0), ResourceDescription::new().path_rewrite(Truncate))
            .build()
            .unwrap();
        let ctx = context(registry);

        let command = Command::new("add", addr("/subsystem=web/connector=http"));
        let err = transform_command(&ctx, &command).unwrap_err();
        assert!(matches!(err, TransformError::UnclaimedSegments { .. }));

        let err = tree::transform_tree(&ctx).unwrap_err();
        assert!(matches!(err, TransformError::UnclaimedSegments { .. }));
    }
}
