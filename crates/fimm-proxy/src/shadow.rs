//! Blind proxies for batched mode.

use fimm_protocol::{Arg, Command, RemotePath};
use fimm_session::Session;

use crate::error::ProxyError;

/// A schema-agnostic proxy.
///
/// Schema discovery needs an immediate round trip, which batched mode
/// forbids, so shadows speculatively build paths and queue commands for
/// any access; all correctness checking is deferred to the engine when
/// the batch flushes.
#[derive(Clone)]
pub struct Shadow {
    session: Session,
    path: RemotePath,
}

impl Shadow {
    #[must_use]
    pub const fn new(session: Session, path: RemotePath) -> Self {
        Self { session, path }
    }

    #[must_use]
    pub const fn path(&self) -> &RemotePath {
        &self.path
    }

    /// A shadow one attribute deeper, `self.name`. No command is emitted.
    #[must_use]
    pub fn attr(&self, name: &str) -> Self {
        Self::new(self.session.clone(), self.path.child(name))
    }

    /// A shadow at the 1-based element `self[idx]`. No command is emitted.
    #[must_use]
    pub fn at(&self, idx: usize) -> Self {
        Self::new(self.session.clone(), self.path.index(idx))
    }

    /// Queue an assignment to `self.name`.
    ///
    /// # Errors
    /// Session failures (executes immediately if batching is off).
    pub async fn set(&self, name: &str, value: impl Into<Arg> + Send) -> Result<(), ProxyError> {
        let command = Command::Assign {
            path: self.path.child(name),
            value: value.into(),
        };
        self.session.submit(&command.encode()).await?;
        Ok(())
    }

    /// Queue a call of this path. No return value: the blob produced at
    /// flush time is not decoded.
    ///
    /// # Errors
    /// Session failures.
    pub async fn call(&self, args: &[Arg]) -> Result<(), ProxyError> {
        let command = Command::Call {
            path: self.path.clone(),
            args: args.to_vec(),
        };
        self.session.submit(&command.encode()).await?;
        Ok(())
    }

    /// Queue a `Ref&` alias bound to calling this path and return a
    /// shadow addressing the alias.
    ///
    /// # Errors
    /// Session failures.
    pub async fn call_ref(&self, args: &[Arg]) -> Result<Self, ProxyError> {
        self.alias_call(args, true).await
    }

    /// Value-copy counterpart of [`Shadow::call_ref`], via `Set`.
    ///
    /// # Errors
    /// Session failures.
    pub async fn call_set(&self, args: &[Arg]) -> Result<Self, ProxyError> {
        self.alias_call(args, false).await
    }

    async fn alias_call(&self, args: &[Arg], by_ref: bool) -> Result<Self, ProxyError> {
        let name = self.session.next_ref_name().await;
        let expr = Command::call_expr(&self.path, args);
        let command = if by_ref {
            Command::RefAlias { name: name.clone(), expr }
        } else {
            Command::SetAlias { name: name.clone(), expr }
        };
        self.session.submit(&command.encode()).await?;
        Ok(Self::new(self.session.clone(), RemotePath::root(&name)))
    }
}
