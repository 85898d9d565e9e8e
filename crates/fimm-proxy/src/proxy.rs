//! The checked-or-blind proxy split and session entry points.

use std::path::Path;

use fimm_protocol::{Arg, RemotePath, Value};
use fimm_session::Session;

use crate::error::ProxyError;
use crate::node::Node;
use crate::shadow::Shadow;

/// Name of the engine's root object.
pub const ROOT: &str = "app";

/// A proxy bound to one remote path.
///
/// `Checked` carries a resolved schema and validates every access;
/// `Blind` skips validation and decoding entirely, which is the only
/// workable shape while batched mode forbids introspection.
#[derive(Clone)]
pub enum Proxy {
    Checked(Node),
    Blind(Shadow),
}

impl Proxy {
    #[must_use]
    pub const fn path(&self) -> &RemotePath {
        match self {
            Self::Checked(node) => node.path(),
            Self::Blind(shadow) => shadow.path(),
        }
    }

    #[must_use]
    pub const fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Checked(node) => Some(node),
            Self::Blind(_) => None,
        }
    }

    #[must_use]
    pub fn into_node(self) -> Option<Node> {
        match self {
            Self::Checked(node) => Some(node),
            Self::Blind(_) => None,
        }
    }

    #[must_use]
    pub fn into_shadow(self) -> Option<Shadow> {
        match self {
            Self::Blind(shadow) => Some(shadow),
            Self::Checked(_) => None,
        }
    }

    /// Assign an attribute under either variant.
    ///
    /// # Errors
    /// Checked proxies validate the child; blind proxies only queue.
    pub async fn set(&self, name: &str, value: impl Into<Arg> + Send) -> Result<(), ProxyError> {
        match self {
            Self::Checked(node) => node.set(name, value).await,
            Self::Blind(shadow) => shadow.set(name, value).await,
        }
    }

    /// Invoke under either variant. Blind calls never produce a value.
    ///
    /// # Errors
    /// Checked proxies enforce the function type; blind proxies only queue.
    pub async fn call(&self, args: &[Arg]) -> Result<Option<Value>, ProxyError> {
        match self {
            Self::Checked(node) => node.call(args).await,
            Self::Blind(shadow) => {
                shadow.call(args).await?;
                Ok(None)
            }
        }
    }
}

/// Proxy for `path`: blind while the session is batching (schema
/// discovery would need an immediate round trip), checked otherwise.
///
/// # Errors
/// Introspection failures in the checked case.
pub async fn wrap(session: &Session, path: RemotePath) -> Result<Proxy, ProxyError> {
    if session.is_batched().await {
        Ok(Proxy::Blind(Shadow::new(session.clone(), path)))
    } else {
        Ok(Proxy::Checked(Node::resolve(session, path).await?))
    }
}

/// Connect to a running engine and wrap its root object.
///
/// # Errors
/// Connect and introspection failures.
pub async fn connect(host: &str, port: u16) -> Result<(Session, Proxy), ProxyError> {
    let session = Session::new();
    session.connect(host, port).await?;
    let root = wrap(&session, RemotePath::root(ROOT)).await?;
    Ok((session, root))
}

/// Spawn an engine executable, connect to it and wrap its root object.
///
/// # Errors
/// Spawn, connect and introspection failures.
pub async fn start(executable: &Path, port: Option<u16>) -> Result<(Session, Proxy), ProxyError> {
    let session = Session::new();
    session.spawn_and_connect(executable, port).await?;
    let root = wrap(&session, RemotePath::root(ROOT)).await?;
    Ok((session, root))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use fimm_session::{SessionError, Transport};
    use futures::TryStreamExt;
    use tokio_test::assert_ok;

    use super::*;
    use crate::node::Attr;

    /// Transport double that answers each command from a canned table.
    struct Engine {
        replies: HashMap<String, String>,
        sent: Arc<Mutex<Vec<String>>>,
        last: Option<String>,
    }

    impl Engine {
        fn new() -> (Box<Self>, Arc<Mutex<Vec<String>>>) {
            let mut replies = HashMap::new();
            let table = [
                (
                    "help app",
                    "RETVAL:app NODE\nChildren:\nwdir STRING\nsubnodes LIST<NODE>\nviews LIST<NODE>\nvals LIST<FLOAT>\nsetwdir FUNCTION\nfindview FUNCTION\ncdev NODE\n",
                ),
                ("app.wdir", "RETVAL:\nC:\\work\n"),
                ("help app.subnodes", "RETVAL:subnodes LIST<NODE>\n"),
                ("app.subnodes", "RETVAL:\nsubnodes[1] first\nsubnodes[2] second\n"),
                (
                    "help app.subnodes[1]",
                    "RETVAL:subnodes[1] NODE\nChildren:\nwidth FLOAT\n",
                ),
                (
                    "help app.subnodes[2]",
                    "RETVAL:subnodes[2] NODE\nChildren:\nwidth FLOAT\n",
                ),
                ("app.subnodes[1].width", "RETVAL:\n3.0\n"),
                ("help app.views", "RETVAL:views LIST<NODE>\n"),
                ("app.views", "RETVAL:\n<EMPTY>\n"),
                ("help app.vals", "RETVAL:vals LIST<FLOAT>\n"),
                ("app.vals", "RETVAL:\nvals[1] 1.5\nvals[2] 2.5\n"),
                ("help app.vals[1]", "RETVAL:vals[1] FLOAT\n"),
                ("app.vals[1]", "RETVAL:\n1.5\n"),
                (
                    "help app.setwdir",
                    "RETVAL:setwdir FUNCTION - (dir): set the working directory\n",
                ),
                ("help app.findview", "RETVAL:findview FUNCTION\n"),
                ("help app.cdev", "RETVAL:cdev NODE\nChildren:\nwidth FLOAT\n"),
                ("help ref1", "RETVAL:ref1 NODE\nChildren:\nwidth FLOAT\n"),
                ("app.setwdir(C:\\tmp)", "RETVAL:\nOK\n"),
                ("help app.missing", "ERROR no such member"),
            ];
            for (command, reply) in table {
                replies.insert(command.to_owned(), reply.to_owned());
            }

            let sent = Arc::new(Mutex::new(Vec::new()));
            let engine = Box::new(Self {
                replies,
                sent: Arc::clone(&sent),
                last: None,
            });
            (engine, sent)
        }
    }

    #[async_trait]
    impl Transport for Engine {
        async fn send_line(&mut self, line: &str) -> std::io::Result<()> {
            self.sent.lock().unwrap().push(line.to_owned());
            self.last = Some(line.to_owned());
            Ok(())
        }

        async fn recv_blob(&mut self) -> std::io::Result<String> {
            let last = self.last.take().unwrap_or_default();
            Ok(self
                .replies
                .get(&last)
                .cloned()
                .unwrap_or_else(|| "RETVAL:\nOK\n".to_owned()))
        }
    }

    fn session() -> (Session, Arc<Mutex<Vec<String>>>) {
        let (engine, sent) = Engine::new();
        (Session::from_transport(engine), sent)
    }

    async fn root(session: &Session) -> Node {
        Node::resolve(session, RemotePath::root(ROOT)).await.unwrap()
    }

    #[tokio::test]
    async fn describes_root_schema() {
        let (session, _) = session();
        let app = root(&session).await;

        assert_eq!(app.schema().name.as_deref(), Some("app"));
        assert!(!app.node_type().is_primitive());
        let wdir = app.schema().child("wdir").unwrap();
        assert!(wdir.node_type.is_primitive());
        let subnodes = app.schema().child("subnodes").unwrap();
        assert!(subnodes.node_type.is_list());
    }

    #[tokio::test]
    async fn describe_is_cached_per_path() {
        let (session, sent) = session();
        let _ = root(&session).await;
        let _ = root(&session).await;

        let help_count = sent
            .lock()
            .unwrap()
            .iter()
            .filter(|line| *line == "help app")
            .count();
        assert_eq!(help_count, 1);
    }

    #[tokio::test]
    async fn node_debug_shows_path_and_type() {
        let (session, _) = session();
        let app = root(&session).await;

        let rendered = format!("{app:?}");
        assert!(rendered.contains("app"));
        assert!(rendered.contains("NODE"));

        let attr = app.get("wdir").await.unwrap();
        assert!(format!("{attr:?}").contains("C:\\\\work"));
    }

    #[tokio::test]
    async fn gets_primitive_attribute_decoded() {
        let (session, _) = session();
        let app = root(&session).await;

        let value = app.get("wdir").await.unwrap().into_value().unwrap();
        assert_eq!(value, Value::Text("C:\\work".into()));
    }

    #[tokio::test]
    async fn gets_composite_attribute_as_node() {
        let (session, _) = session();
        let app = root(&session).await;

        let cdev = app.get("cdev").await.unwrap().into_node().unwrap();
        assert_eq!(cdev.path().as_str(), "app.cdev");
        assert!(cdev.schema().child("width").is_some());
    }

    #[tokio::test]
    async fn unknown_attribute_is_rejected_locally() {
        let (session, sent) = session();
        let app = root(&session).await;
        let before = sent.lock().unwrap().len();

        let err = app.get("nope").await.unwrap_err();
        assert!(matches!(err, ProxyError::UnknownAttribute { .. }));
        // rejected from the cached schema, nothing hit the wire
        assert_eq!(sent.lock().unwrap().len(), before);
    }

    #[tokio::test]
    async fn remote_error_surfaces_from_describe() {
        let (session, _) = session();
        let err = Node::resolve(&session, RemotePath::root("app").child("missing"))
            .await
            .unwrap_err();
        let ProxyError::Remote(msg) = err else {
            panic!("expected remote error");
        };
        assert!(msg.contains("no such member"));
    }

    #[tokio::test]
    async fn sets_primitive_attribute_immediately() {
        let (session, sent) = session();
        let app = root(&session).await;

        assert_ok!(app.set("wdir", "D:\\data").await);
        assert!(sent
            .lock()
            .unwrap()
            .iter()
            .any(|line| line == "app.wdir=D:\\data"));
    }

    #[tokio::test]
    async fn setting_composite_attribute_is_a_contract_error() {
        let (session, _) = session();
        let app = root(&session).await;

        let err = app.set("cdev", 1.0).await.unwrap_err();
        assert!(matches!(err, ProxyError::NotPrimitive { .. }));
    }

    #[tokio::test]
    async fn list_length_counts_labelled_rows() {
        let (session, _) = session();
        let app = root(&session).await;
        let subnodes = app.get("subnodes").await.unwrap().into_node().unwrap();

        assert_eq!(subnodes.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_marker_reads_as_length_zero() {
        let (session, _) = session();
        let app = root(&session).await;
        let views = app.get("views").await.unwrap().into_node().unwrap();

        assert_eq!(views.len().await.unwrap(), 0);
        let items: Vec<Attr> = views.iter().try_collect().await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn indexes_composite_elements_one_based() {
        let (session, _) = session();
        let app = root(&session).await;
        let subnodes = app.get("subnodes").await.unwrap().into_node().unwrap();

        let first = subnodes.index(1).await.unwrap().into_node().unwrap();
        assert_eq!(first.path().as_str(), "app.subnodes[1]");

        let width = first.get("width").await.unwrap().into_value().unwrap();
        assert_eq!(width, Value::Number(3.0));
    }

    #[tokio::test]
    async fn indexes_primitive_elements_decoded() {
        let (session, _) = session();
        let app = root(&session).await;
        let vals = app.get("vals").await.unwrap().into_node().unwrap();

        let first = vals.index(1).await.unwrap().into_value().unwrap();
        assert_eq!(first, Value::Number(1.5));
    }

    #[tokio::test]
    async fn indexing_a_non_list_is_a_contract_error() {
        let (session, _) = session();
        let app = root(&session).await;

        assert!(matches!(
            app.index(1).await.unwrap_err(),
            ProxyError::NotAList(_)
        ));
        assert!(matches!(app.len().await.unwrap_err(), ProxyError::NotAList(_)));
    }

    #[tokio::test]
    async fn iteration_yields_elements_in_order_and_restarts() {
        let (session, _) = session();
        let app = root(&session).await;
        let subnodes = app.get("subnodes").await.unwrap().into_node().unwrap();

        for _ in 0..2 {
            let items: Vec<Attr> = subnodes.iter().try_collect().await.unwrap();
            let paths: Vec<&str> = items
                .iter()
                .map(|attr| match attr {
                    Attr::Node(node) => node.path().as_str(),
                    Attr::Value(_) => panic!("expected composite elements"),
                })
                .collect();
            assert_eq!(paths, ["app.subnodes[1]", "app.subnodes[2]"]);
        }
    }

    #[tokio::test]
    async fn calls_function_nodes() {
        let (session, _) = session();
        let app = root(&session).await;
        let setwdir = app.get("setwdir").await.unwrap().into_node().unwrap();

        let result = setwdir.call(&[Arg::from("C:\\tmp")]).await.unwrap();
        assert_eq!(result, Some(Value::Text("OK".into())));
    }

    #[tokio::test]
    async fn calling_a_non_function_is_a_contract_error() {
        let (session, _) = session();
        let app = root(&session).await;

        assert!(matches!(
            app.call(&[]).await.unwrap_err(),
            ProxyError::NotAFunction(_)
        ));
    }

    #[tokio::test]
    async fn ref_call_returns_proxy_bound_to_alias() {
        let (session, sent) = session();
        let app = root(&session).await;
        let findview = app.get("findview").await.unwrap().into_node().unwrap();

        let view = findview.call_ref(&[Arg::from(1_i64)]).await.unwrap();
        assert!(sent
            .lock()
            .unwrap()
            .iter()
            .any(|line| line == "Ref& ref1=app.findview(1)"));
        let node = view.into_node().unwrap();
        assert_eq!(node.path().as_str(), "ref1");
    }

    #[tokio::test]
    async fn wrap_is_blind_while_batched() {
        let (session, sent) = session();
        session.set_batched(true).await.unwrap();

        let app = wrap(&session, RemotePath::root(ROOT)).await.unwrap();
        let Proxy::Blind(shadow) = app else {
            panic!("expected a blind proxy under batching");
        };

        shadow.attr("subnodes").at(1).set("width", 2.5).await.unwrap();
        shadow.attr("setwdir").call(&[Arg::from("C:\\tmp")]).await.unwrap();
        let alias = shadow.attr("findview").call_ref(&[Arg::from(1_i64)]).await.unwrap();
        assert_eq!(alias.path().as_str(), "ref1");

        // nothing went out yet
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(session.pending_count().await, 3);

        session.flush().await.unwrap();
        assert_eq!(
            sent.lock().unwrap().as_slice(),
            ["app.subnodes[1].width=2.5\napp.setwdir(C:\\tmp)\nRef& ref1=app.findview(1)"]
        );
        assert_eq!(session.pending_count().await, 0);
    }

    #[tokio::test]
    async fn introspection_is_rejected_while_batched() {
        let (session, _) = session();
        session.set_batched(true).await.unwrap();

        let err = Node::resolve(&session, RemotePath::root(ROOT)).await.unwrap_err();
        assert!(matches!(
            err,
            ProxyError::Session(SessionError::BatchModeActive)
        ));
    }

    #[tokio::test]
    async fn checked_set_queues_under_batching() {
        let (session, sent) = session();
        let app = root(&session).await;

        session.set_batched(true).await.unwrap();
        let before = sent.lock().unwrap().len();
        app.set("wdir", "E:\\").await.unwrap();

        assert_eq!(sent.lock().unwrap().len(), before);
        assert_eq!(session.pending_count().await, 1);
    }
}
