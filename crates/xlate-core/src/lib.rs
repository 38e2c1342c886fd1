//! Version translation engine
//!
//! Translates resource trees, commands and responses between the current
//! management model and the older model a peer runs.
//!
//! # Core Concepts
//!
//! - [`TransformerRegistry`]: Radix-trie of per-version translation rules
//! - [`TransformationTarget`]: One peer, its versions and its registry
//! - [`TransformContext`]: Immutable view of one translation
//! - [`PathRewriteChain`]: Per-segment address rewrite rules
//! - [`TransformedCommand`]: Outgoing command plus response callbacks
//! - [`DeltaChain`]: Ordered one-version deltas for a feature
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use xlate_core::{PeerKind, RegistryBuilder, ResourceDescription, TransformationTarget, Translator};
//! use xlate_model::{Command, Version};
//!
//! let registry = RegistryBuilder::new()
//!     .feature_default(
//!         "logging",
//!         ResourceDescription::new().child(("handler", "*"), |d| d.rename_kind("appender")),
//!     )
//!     .build()
//!     .unwrap();
//! let target = TransformationTarget::builder("leaf-1", PeerKind::Leaf, Version::new(1, 0, 0))
//!     .registry(Arc::new(registry))
//!     .build();
//!
//! let translator = Translator::new(Arc::new(target));
//! let command = Command::new("add", "/subsystem=logging/handler=console".parse().unwrap());
//! let out = translator.transform_command(&command).unwrap();
//! assert_eq!(
//!     out.command().unwrap().address().to_string(),
//!     "/subsystem=logging/appender=console"
//! );
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod alias;
mod attachment;
mod chain;
mod command;
mod composite;
mod config;
mod context;
mod error;
mod path;
mod policy;
mod registry;
mod reject;
mod target;
mod translator;
mod tree;

pub use alias::{AliasContext, AliasResolver, AliasTransformer, StaticAlias};
pub use attachment::{AttachmentKey, Attachments};
pub use chain::{ChainedDeltaBuilder, DeltaChain, DeltaStep};
pub use command::{
    transform_command, CommandFn, CommandScope, CommandTransformer, DiscardCommand, TransformedCommand,
};
pub use composite::{split_composite, CompositeSplit, CompositeStep};
pub use config::{ConfigError, EngineConfig};
pub use context::{
    DiscardResource, NodeScope, PassThroughResource, ResourceFn, ResourceTransformer, TransformContext, Transformed,
};
pub use error::TransformError;
pub use path::{AddressBuilder, PassThrough, PathRewrite, PathRewriteChain, RenameKind, ReplaceSegment};
pub use policy::{
    AcceptAll, FirstRejection, FnRewriter, IdentityRewriter, RejectSuccess, RejectionPolicy, ResponseRewriter,
    RewriterChain, Verdict,
};
pub use registry::{
    CommandResolution, RegistryBuilder, ResolvedEntry, ResourceDescription, TransformerEntry, TransformerRegistry,
    FEATURE_TYPE,
};
pub use reject::{is_expression, ExpressionChecker, RejectValueKind, ValueChecker, WRITE_ATTRIBUTE};
pub use target::{PeerKind, TargetBuilder, TransformationTarget};
pub use translator::Translator;
pub use tree::{transform_subtree, transform_tree};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
