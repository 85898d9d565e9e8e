//! Proxy-layer errors.

use fimm_protocol::{ProtocolError, RemotePath};
use fimm_session::SessionError;
use thiserror::Error;

/// Proxy failure: contract violations on top of everything bubbling up
/// from the session and the codec.
///
/// Contract violations (indexing a non-list, calling a non-function,
/// setting a composite attribute) are programming errors; they fail fast
/// and are never recovered automatically.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The engine answered with its `ERROR` marker.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("{path} has no attribute `{name}`")]
    UnknownAttribute { path: RemotePath, name: String },

    #[error("{path}.{name} is not a primitive attribute")]
    NotPrimitive { path: RemotePath, name: String },

    #[error("{0} is not a list")]
    NotAList(RemotePath),

    #[error("{0} is not a function")]
    NotAFunction(RemotePath),

    /// A list length read decoded to something that is neither the empty
    /// marker nor a list.
    #[error("length read of {0} returned a non-list value")]
    LengthShape(RemotePath),
}

/// Decode a raw response blob, promoting remote `ERROR` bodies out of the
/// codec error space.
pub(crate) fn decode(raw: &str) -> Result<fimm_protocol::Value, ProxyError> {
    match fimm_protocol::decode_response(raw) {
        Ok(value) => Ok(value),
        Err(ProtocolError::Remote(msg)) => Err(ProxyError::Remote(msg)),
        Err(e) => Err(e.into()),
    }
}
