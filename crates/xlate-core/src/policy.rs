//! Rejection policies and response rewriters
//!
//! A translated command carries two callbacks for the peer's answer: a
//! [`RejectionPolicy`] that decides whether the peer silently did something it
//! could not honor, and a [`ResponseRewriter`] that maps the answer back into
//! the sender's vocabulary.

use std::fmt;
use std::sync::Arc;
use xlate_model::Response;

/// Outcome of evaluating a peer's response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Response is trustworthy
    Accept,

    /// Peer could not have honored the command
    Reject { description: String },
}

impl Verdict {
    /// Rejection with `description`
    #[inline]
    #[must_use]
    pub fn reject(description: impl Into<String>) -> Self {
        Self::Reject {
            description: description.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_reject(&self) -> bool {
        matches!(self, Self::Reject { .. })
    }

    /// Rejection description, if rejected
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Accept => None,
            Self::Reject { description } => Some(description),
        }
    }
}

/// Decides whether a raw peer response must be treated as a rejection
pub trait RejectionPolicy: Send + Sync + fmt::Debug {
    /// Evaluate the raw response
    fn evaluate(&self, response: &Response) -> Verdict;
}

/// Maps a raw peer response into the sender's model
pub trait ResponseRewriter: Send + Sync + fmt::Debug {
    /// Rewrite the response
    fn rewrite(&self, response: Response) -> Response;
}

/// Never rejects
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl RejectionPolicy for AcceptAll {
    fn evaluate(&self, _response: &Response) -> Verdict {
        Verdict::Accept
    }
}

/// Rejects a response the peer reports as successful
///
/// Used when the command carried something the peer cannot interpret: a
/// successful outcome means the peer applied it with different semantics.
#[derive(Debug, Clone)]
pub struct RejectSuccess {
    description: String,
}

impl RejectSuccess {
    #[inline]
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

impl RejectionPolicy for RejectSuccess {
    fn evaluate(&self, response: &Response) -> Verdict {
        if response.is_success() {
            Verdict::reject(self.description.clone())
        } else {
            Verdict::Accept
        }
    }
}

/// Returns the response unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRewriter;

impl ResponseRewriter for IdentityRewriter {
    fn rewrite(&self, response: Response) -> Response {
        response
    }
}

/// Rewriter backed by a closure
pub struct FnRewriter<F> {
    rewrite: F,
}

impl<F> FnRewriter<F>
where
    F: Fn(Response) -> Response + Send + Sync,
{
    #[inline]
    #[must_use]
    pub fn new(rewrite: F) -> Self {
        Self { rewrite }
    }
}

impl<F> fmt::Debug for FnRewriter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnRewriter")
    }
}

impl<F> ResponseRewriter for FnRewriter<F>
where
    F: Fn(Response) -> Response + Send + Sync,
{
    fn rewrite(&self, response: Response) -> Response {
        (self.rewrite)(response)
    }
}

/// Policies evaluated in order; the first rejection wins
#[derive(Debug, Clone, Default)]
pub struct FirstRejection {
    policies: Vec<Arc<dyn RejectionPolicy>>,
}

impl FirstRejection {
    #[inline]
    #[must_use]
    pub fn new(policies: Vec<Arc<dyn RejectionPolicy>>) -> Self {
        Self { policies }
    }
}

impl RejectionPolicy for FirstRejection {
    fn evaluate(&self, response: &Response) -> Verdict {
        self.policies
            .iter()
            .map(|policy| policy.evaluate(response))
            .find(Verdict::is_reject)
            .unwrap_or(Verdict::Accept)
    }
}

/// Rewriters applied in order, each seeing the previous output
#[derive(Debug, Clone, Default)]
pub struct RewriterChain {
    rewriters: Vec<Arc<dyn ResponseRewriter>>,
}

impl RewriterChain {
    #[inline]
    #[must_use]
    pub fn new(rewriters: Vec<Arc<dyn ResponseRewriter>>) -> Self {
        Self { rewriters }
    }
}

impl ResponseRewriter for RewriterChain {
    fn rewrite(&self, response: Response) -> Response {
        self.rewriters
            .iter()
            .fold(response, |current, rewriter| rewriter.rewrite(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reject_success_only_rejects_successes() {
        let policy = RejectSuccess::new("expressions unsupported");
        assert_eq!(
            policy.evaluate(&Response::success()),
            Verdict::reject("expressions unsupported")
        );
        assert_eq!(policy.evaluate(&Response::failed("x")), Verdict::Accept);
        assert_eq!(policy.evaluate(&Response::undefined()), Verdict::Accept);
    }

    #[test]
    fn first_rejection_wins() {
        let policy = FirstRejection::new(vec![
            Arc::new(AcceptAll),
            Arc::new(RejectSuccess::new("first")),
            Arc::new(RejectSuccess::new("second")),
        ]);
        assert_eq!(policy.evaluate(&Response::success()).description(), Some("first"));
        assert!(FirstRejection::default().evaluate(&Response::success()) == Verdict::Accept);
    }

    #[test]
    fn rewriter_chain_applies_in_order() {
        let chain = RewriterChain::new(vec![
            Arc::new(FnRewriter::new(|mut r: Response| {
                r.result = json!([r.result.clone(), "a"]);
                r
            })),
            Arc::new(IdentityRewriter),
            Arc::new(FnRewriter::new(|mut r: Response| {
                r.result = json!([r.result.clone(), "b"]);
                r
            })),
        ]);
        let out = chain.rewrite(Response::success_with(json!(0)));
        assert_eq!(out.result, json!([[0, "a"], "b"]));
    }
}
