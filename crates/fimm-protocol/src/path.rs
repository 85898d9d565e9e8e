//! Addresses into the remote object tree.

use std::fmt;

use serde::Serialize;

/// A dotted/bracketed address of one node in the remote object tree,
/// e.g. `app.subnodes[1].width`.
///
/// Paths are immutable once constructed and are the sole identity key
/// for schema caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RemotePath(String);

impl RemotePath {
    /// Path of a top-level object, usually `app`.
    #[must_use]
    pub fn root(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// Path of the named child, `self.name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}.{name}", self.0))
    }

    /// Path of a list element, `self[idx]`. Indices are 1-based on the wire.
    #[must_use]
    pub fn index(&self, idx: usize) -> Self {
        Self(format!("{}[{idx}]", self.0))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
