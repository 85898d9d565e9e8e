//! Dynamic proxies over the engine's remote object tree.
//!
//! A caller wraps a session into a root [`Proxy`] and navigates the tree
//! as if it were local: attribute get/set, 1-based indexing, iteration
//! and function invocation. Two proxy variants share that surface:
//! - [`Node`] - schema-checked, materialized lazily from `help`
//!   introspection and validated against the cached child descriptors
//! - [`Shadow`] - blind, used under batched mode, speculatively emitting
//!   commands for any access

pub mod error;
pub mod introspect;
pub mod node;
pub mod proxy;
pub mod shadow;

pub use error::ProxyError;
pub use introspect::{describe, help_text};
pub use node::{Attr, Node};
pub use proxy::{connect, start, wrap, Proxy, ROOT};
pub use shadow::Shadow;
