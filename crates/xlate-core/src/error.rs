//! Error types for the translation engine
//!
//! Every variant is a configuration error: translation stops and no partial
//! output is trusted. Policy rejections are not errors; they travel with the
//! translated artifact as a [`RejectionPolicy`](crate::RejectionPolicy).

use xlate_model::{Address, AddressError};

/// Main translation error type
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Rewrite chain ran out of rules, or a rule stopped descending
    #[error("rewrite chain for {original} left segments unclaimed: {remaining}")]
    UnclaimedSegments { original: Address, remaining: Address },

    /// A sibling already exists at the rewritten address
    #[error("duplicate resource at {address}")]
    DuplicateResource { address: Address },

    /// The parent of the rewritten address was never written
    #[error("cannot write {address}: parent does not exist in the translated tree")]
    MissingAncestor { address: Address },

    /// Child of an order-preserving collection moved to another type
    #[error("ordered child {original} cannot be remapped to {rewritten}")]
    OrderedChildRenamed { original: Address, rewritten: Address },

    /// Chain composition helper applied to the wrong kind of context
    #[error("invalid chain composition: {0}")]
    ChainMisuse(String),

    /// Registry lookup failed for an address
    #[error("failed to resolve transformer for {address}: {reason}")]
    ResolutionFailed { address: Address, reason: String },

    /// Alias substitution never reached a canonical address
    #[error("alias resolution for {address} did not settle after {hops} hops")]
    AliasCycle { address: Address, hops: usize },

    /// Tree deeper than the configured limit
    #[error("resource tree at {address} exceeds depth limit {limit}")]
    DepthExceeded { address: Address, limit: usize },

    /// Attributes hold values the peer cannot interpret
    #[error("{address}: attributes {} use values the target cannot interpret", .attributes.join(", "))]
    RejectedAttributes {
        address: Address,
        attributes: Vec<String>,
    },

    /// Same address registered twice for one version
    #[error("duplicate registration at {address} for version {version}")]
    DuplicateRegistration { address: Address, version: String },

    /// Malformed registration
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    /// Malformed address
    #[error("address error: {0}")]
    Address(#[from] AddressError),
}

impl TransformError {
    /// Address the error refers to, if any
    #[must_use]
    pub fn address(&self) -> Option<&Address> {
        match self {
            Self::UnclaimedSegments { original, .. } => Some(original),
            Self::DuplicateResource { address }
            | Self::MissingAncestor { address }
            | Self::ResolutionFailed { address, .. }
            | Self::AliasCycle { address, .. }
            | Self::DepthExceeded { address, .. }
            | Self::RejectedAttributes { address, .. }
            | Self::DuplicateRegistration { address, .. } => Some(address),
            Self::OrderedChildRenamed { original, .. } => Some(original),
            Self::ChainMisuse(_) | Self::InvalidRegistration(_) | Self::Address(_) => None,
        }
    }

    /// Wrap a failure raised while resolving `address`
    #[must_use]
    pub fn resolving(address: &Address, source: &TransformError) -> Self {
        Self::ResolutionFailed {
            address: address.clone(),
            reason: source.to_string(),
        }
    }
}
