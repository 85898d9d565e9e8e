//! Remote schema discovery via `help`.

use fimm_protocol::{parse_help, strip_envelope, Command, NodeSchema, ProtocolError, RemotePath};
use fimm_session::Session;

use crate::error::ProxyError;

/// Describe the node at `path`, returning its cached schema when this
/// session has already seen the path.
///
/// Introspection always takes the immediate path: the round trip cannot
/// be deferred, so this fails with `BatchModeActive` while batching is on.
///
/// # Errors
/// Session failures, `Remote` for engine-side errors, `BadHelp` for
/// unparsable first lines.
pub async fn describe(session: &Session, path: &RemotePath) -> Result<NodeSchema, ProxyError> {
    if let Some(schema) = session.cached_schema(path).await {
        return Ok(schema);
    }

    let body = help_text(session, path).await?;
    let schema = match parse_help(&body) {
        Ok(schema) => schema,
        Err(ProtocolError::Remote(msg)) => return Err(ProxyError::Remote(msg)),
        Err(e) => return Err(e.into()),
    };

    tracing::debug!(%path, children = schema.children.len(), "described node");
    session.cache_schema(path.clone(), schema.clone()).await;
    Ok(schema)
}

/// Raw, uncached help text for `path`.
///
/// # Errors
/// Session failures and malformed/`ERROR` envelopes.
pub async fn help_text(session: &Session, path: &RemotePath) -> Result<String, ProxyError> {
    let command = Command::Help { path: path.clone() }.encode();
    let raw = session.execute_immediate(&command).await?;
    match strip_envelope(&raw) {
        Ok(body) => Ok(body.to_owned()),
        Err(ProtocolError::Remote(msg)) => Err(ProxyError::Remote(msg)),
        Err(e) => Err(e.into()),
    }
}
