//! Translation model
//!
//! Value types shared by the translation engine and its callers.
//!
//! # Core Concepts
//!
//! - [`Address`]: Ordered `(type, name)` segments locating a tree node
//! - [`Resource`]: Attribute document plus typed child collections
//! - [`Command`]: Named request against an address, possibly composite
//! - [`Response`]: Document a peer returns after executing a command
//! - [`Version`]: `major.minor.micro` model version
//!
//! # Example
//!
//! ```rust
//! use xlate_model::{Address, Command, Resource};
//!
//! let address: Address = "/subsystem=logging/handler=console".parse().unwrap();
//! let command = Command::new("add", address.clone()).param("level", "INFO");
//!
//! let tree = Resource::new().child(
//!     ("subsystem", "logging"),
//!     Resource::new().child(("handler", "console"), Resource::new()),
//! );
//! assert!(tree.navigate(command.address()).is_some());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod address;
mod command;
mod resource;
mod response;
mod version;

pub use address::{Address, AddressError, Segment, WILDCARD};
pub use command::{Command, COMPOSITE};
pub use resource::{Children, Resource};
pub use response::{Outcome, Response};
pub use version::{Version, VersionError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
