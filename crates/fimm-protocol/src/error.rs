//! Codec-level errors.

use thiserror::Error;

/// A decode failure.
///
/// Everything here indicates a codec/protocol mismatch (or a remote-side
/// failure), never a legitimately non-numeric value: ambiguous scalar
/// text degrades to a string instead of erroring.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Response body did not carry the `RETVAL:` envelope.
    #[error("response missing RETVAL envelope")]
    BadEnvelope,

    /// Matrix label indices must be 1-based, strictly increasing and
    /// contiguous at each nesting level.
    #[error("matrix label index out of order: expected {expected}, found {found}")]
    NonContiguousIndex { expected: usize, found: usize },

    /// A line inside a tabular body failed the label grammar.
    #[error("malformed matrix row: {0}")]
    MalformedRow(String),

    /// Response began with the remote `ERROR` marker.
    #[error("remote error: {0}")]
    Remote(String),

    /// Introspection text whose first line fails the declaration grammar.
    #[error("unparsable help text: {0}")]
    BadHelp(String),
}
