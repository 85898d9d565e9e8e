//! Schema-checked proxies over remote nodes.

use std::fmt;

use fimm_protocol::{Arg, Command, NodeSchema, NodeType, RemotePath, Value, EMPTY_MARKER};
use fimm_session::Session;
use futures::Stream;

use crate::error::{decode, ProxyError};
use crate::introspect;
use crate::shadow::Shadow;
use crate::Proxy;

/// Result of a checked attribute access or indexing: a decoded primitive
/// or a deeper proxy.
#[derive(Debug, Clone)]
pub enum Attr {
    Value(Value),
    Node(Node),
}

impl Attr {
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Node(_) => None,
        }
    }

    #[must_use]
    pub fn into_node(self) -> Option<Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Value(_) => None,
        }
    }
}

/// A proxy bound to one remote path with its schema resolved.
///
/// Once resolved, the binding is fixed for the session: schema is assumed
/// immutable per path, so attribute access validates against the cached
/// child descriptors instead of re-asking the engine.
#[derive(Clone)]
pub struct Node {
    session: Session,
    path: RemotePath,
    schema: NodeSchema,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path)
            .field("node_type", self.node_type())
            .finish_non_exhaustive()
    }
}

impl Node {
    /// Resolve the node at `path`, fetching (or reusing) its schema.
    ///
    /// # Errors
    /// Introspection failures; `BatchModeActive` while batching is on.
    pub async fn resolve(session: &Session, path: RemotePath) -> Result<Self, ProxyError> {
        let schema = introspect::describe(session, &path).await?;
        Ok(Self {
            session: session.clone(),
            path,
            schema,
        })
    }

    #[must_use]
    pub const fn path(&self) -> &RemotePath {
        &self.path
    }

    #[must_use]
    pub const fn schema(&self) -> &NodeSchema {
        &self.schema
    }

    #[must_use]
    pub const fn node_type(&self) -> &NodeType {
        &self.schema.node_type
    }

    fn child_type(&self, name: &str) -> Result<&NodeType, ProxyError> {
        self.schema
            .child(name)
            .map(|child| &child.node_type)
            .ok_or_else(|| ProxyError::UnknownAttribute {
                path: self.path.clone(),
                name: name.to_owned(),
            })
    }

    /// Read the named attribute: primitive children come back decoded,
    /// composite children as a resolved child proxy.
    ///
    /// # Errors
    /// `UnknownAttribute` for names outside the schema; session/decode
    /// failures.
    pub async fn get(&self, name: &str) -> Result<Attr, ProxyError> {
        let child_type = self.child_type(name)?;
        let child_path = self.path.child(name);
        if child_type.is_primitive() {
            let raw = self
                .session
                .execute_immediate(&Command::Read { path: child_path }.encode())
                .await?;
            Ok(Attr::Value(decode(&raw)?))
        } else {
            Ok(Attr::Node(Self::resolve(&self.session, child_path).await?))
        }
    }

    /// Assign the named primitive attribute. Queued under batching,
    /// executed (acknowledgement discarded) otherwise.
    ///
    /// # Errors
    /// `NotPrimitive` for composite children.
    pub async fn set(&self, name: &str, value: impl Into<Arg> + Send) -> Result<(), ProxyError> {
        let child_type = self.child_type(name)?;
        if !child_type.is_primitive() {
            return Err(ProxyError::NotPrimitive {
                path: self.path.clone(),
                name: name.to_owned(),
            });
        }
        let command = Command::Assign {
            path: self.path.child(name),
            value: value.into(),
        };
        self.session.submit(&command.encode()).await?;
        Ok(())
    }

    /// 1-based list indexing, matching the engine convention. Primitive
    /// elements come back decoded, composite ones as a proxy.
    ///
    /// # Errors
    /// `NotAList` unless this node is list-typed.
    pub async fn index(&self, idx: usize) -> Result<Attr, ProxyError> {
        if !self.node_type().is_list() {
            return Err(ProxyError::NotAList(self.path.clone()));
        }
        let element = Self::resolve(&self.session, self.path.index(idx)).await?;
        if element.node_type().is_primitive() {
            let raw = self
                .session
                .execute_immediate(&Command::Read { path: element.path.clone() }.encode())
                .await?;
            Ok(Attr::Value(decode(&raw)?))
        } else {
            Ok(Attr::Node(element))
        }
    }

    /// Number of elements in a list-typed node.
    ///
    /// # Errors
    /// `NotAList` for non-lists, `LengthShape` when the raw read decodes
    /// to neither the empty marker nor a list.
    pub async fn len(&self) -> Result<usize, ProxyError> {
        if !self.node_type().is_list() {
            return Err(ProxyError::NotAList(self.path.clone()));
        }
        let raw = self
            .session
            .execute_immediate(&Command::Read { path: self.path.clone() }.encode())
            .await?;
        match decode(&raw)? {
            Value::Text(text) if text.contains(EMPTY_MARKER) => Ok(0),
            Value::List(items) => Ok(items.len()),
            _ => Err(ProxyError::LengthShape(self.path.clone())),
        }
    }

    /// Lazy, restartable iteration over `self[1] ..= self[len]`.
    ///
    /// Each call produces a fresh stream; elements are fetched on demand.
    pub fn iter(&self) -> impl Stream<Item = Result<Attr, ProxyError>> + '_ {
        futures::stream::try_unfold((1_usize, None), move |(next, len)| async move {
            let len = match len {
                Some(len) => len,
                None => self.len().await?,
            };
            if next > len {
                return Ok(None);
            }
            let item = self.index(next).await?;
            Ok(Some((item, (next + 1, Some(len)))))
        })
    }

    fn check_function(&self) -> Result<(), ProxyError> {
        if self.node_type().is_function() {
            Ok(())
        } else {
            Err(ProxyError::NotAFunction(self.path.clone()))
        }
    }

    /// Invoke a function-typed node with positional arguments.
    ///
    /// Returns the decoded result, or `None` when the call was queued
    /// under batching.
    ///
    /// # Errors
    /// `NotAFunction` unless this node is function-typed.
    pub async fn call(&self, args: &[Arg]) -> Result<Option<Value>, ProxyError> {
        self.check_function()?;
        let command = Command::Call {
            path: self.path.clone(),
            args: args.to_vec(),
        };
        match self.session.submit(&command.encode()).await? {
            Some(raw) => Ok(Some(decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Call and keep the result addressable: the call expression is bound
    /// to a fresh `Ref&` alias and a proxy for the alias comes back.
    ///
    /// # Errors
    /// See [`Node::call`].
    pub async fn call_ref(&self, args: &[Arg]) -> Result<Proxy, ProxyError> {
        self.alias_call(args, true).await
    }

    /// Value-copy counterpart of [`Node::call_ref`], via `Set`.
    ///
    /// # Errors
    /// See [`Node::call`].
    pub async fn call_set(&self, args: &[Arg]) -> Result<Proxy, ProxyError> {
        self.alias_call(args, false).await
    }

    async fn alias_call(&self, args: &[Arg], by_ref: bool) -> Result<Proxy, ProxyError> {
        self.check_function()?;
        let name = self.session.next_ref_name().await;
        let expr = Command::call_expr(&self.path, args);
        let command = if by_ref {
            Command::RefAlias { name: name.clone(), expr }
        } else {
            Command::SetAlias { name: name.clone(), expr }
        };
        self.session.submit(&command.encode()).await?;

        let alias = RemotePath::root(&name);
        if self.session.is_batched().await {
            Ok(Proxy::Blind(Shadow::new(self.session.clone(), alias)))
        } else {
            Ok(Proxy::Checked(Self::resolve(&self.session, alias).await?))
        }
    }

    /// Raw help text for this node.
    ///
    /// # Errors
    /// See [`introspect::help_text`].
    pub async fn help_text(&self) -> Result<String, ProxyError> {
        introspect::help_text(&self.session, &self.path).await
    }
}
