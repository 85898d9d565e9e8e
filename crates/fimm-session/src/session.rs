//! Engine session lifecycle: connect, spawn, batching, raw execution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use fimm_protocol::{NodeSchema, RemotePath};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time;

use crate::config::{ConnectPolicy, PortRange};
use crate::error::SessionError;
use crate::ports::PortRegistry;
use crate::transport::{TcpTransport, Transport};

/// Execution mode for commands routed through [`Session::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Each command executes synchronously and returns its raw response.
    Immediate,
    /// Commands queue locally and only go out, undecoded, at flush time.
    Batched,
}

struct Inner {
    transport: Option<Box<dyn Transport>>,
    mode: Mode,
    pending: Vec<String>,
    port: Option<u16>,
    ref_counter: u64,
    schemas: HashMap<RemotePath, NodeSchema>,
}

impl Inner {
    fn new(transport: Option<Box<dyn Transport>>) -> Self {
        Self {
            transport,
            mode: Mode::Immediate,
            pending: Vec::new(),
            port: None,
            ref_counter: 0,
            schemas: HashMap::new(),
        }
    }
}

/// Handle to one engine session.
///
/// Clones share the same underlying connection. At most one command is in
/// flight at a time: every immediate operation holds the session lock
/// until its full response has been read, so per-session ordering is
/// total. There is no read timeout on in-flight responses; a hung engine
/// blocks the caller.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
    ports: &'static PortRegistry,
    policy: ConnectPolicy,
    port_range: PortRange,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A disconnected session using the process-wide port registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new(None))),
            ports: PortRegistry::global(),
            policy: ConnectPolicy::default(),
            port_range: PortRange::default(),
        }
    }

    /// A session with an already-framed transport attached; no port is
    /// reserved. Useful for alternate transports and tests.
    #[must_use]
    pub fn from_transport(transport: Box<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new(Some(transport)))),
            ports: PortRegistry::global(),
            policy: ConnectPolicy::default(),
            port_range: PortRange::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ConnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_port_range(mut self, range: PortRange) -> Self {
        self.port_range = range;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, ports: &'static PortRegistry) -> Self {
        self.ports = ports;
        self
    }

    /// Connect to an engine console.
    ///
    /// Reserves `port` process-wide before dialing and releases it again
    /// if every attempt fails. A successful connect resets the schema
    /// cache.
    ///
    /// # Errors
    /// `AlreadyConnected` if this session holds a connection,
    /// `PortInUse` if another live session reserved the port,
    /// `ConnectFailed` once the retry budget is exhausted.
    pub async fn connect(&self, host: &str, port: u16) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.transport.is_some() {
            return Err(SessionError::AlreadyConnected);
        }
        if !self.ports.reserve(port) {
            return Err(SessionError::PortInUse(port));
        }

        match self.dial(host, port).await {
            Ok(stream) => {
                inner.transport = Some(Box::new(TcpTransport::new(stream)));
                inner.port = Some(port);
                inner.schemas.clear();
                tracing::debug!(host, port, "connected to engine");
                Ok(())
            }
            Err(e) => {
                self.ports.release(port);
                Err(e)
            }
        }
    }

    async fn dial(&self, host: &str, port: u16) -> Result<TcpStream, SessionError> {
        let ConnectPolicy { attempts, retry_delay, handshake_timeout } = self.policy;
        for attempt in 1..=attempts {
            match time::timeout(handshake_timeout, TcpStream::connect((host, port))).await {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(e)) => {
                    tracing::debug!(attempt, error = %e, "connect attempt failed, retrying");
                }
                Err(_) => tracing::debug!(attempt, "connect attempt timed out, retrying"),
            }
            if attempt < attempts {
                time::sleep(retry_delay).await;
            }
        }
        Err(SessionError::ConnectFailed { attempts })
    }

    /// Launch the engine executable and connect to it on loopback.
    ///
    /// Without an explicit port the first free port in the configured
    /// range is used. The child runs in the executable's directory (the
    /// engine resolves its own resources relative to CWD) and is left
    /// running when this session goes away.
    ///
    /// # Errors
    /// Resolution, spawn and connect failures; see [`Session::connect`].
    pub async fn spawn_and_connect(
        &self,
        executable: &Path,
        port: Option<u16>,
    ) -> Result<(), SessionError> {
        let port = match port {
            Some(port) => port,
            None => self
                .ports
                .pick_free(self.port_range)
                .ok_or(SessionError::NoFreePort {
                    start: self.port_range.start,
                    end: self.port_range.end,
                })?,
        };

        let executable = resolve_executable(executable)?;
        let workdir = executable
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        tracing::debug!(executable = %executable.display(), port, "launching engine");
        tokio::process::Command::new(&executable)
            .arg("-pt")
            .arg(port.to_string())
            .current_dir(&workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(SessionError::Spawn)?;

        self.connect("127.0.0.1", port).await
    }

    /// Close the connection and release the port reservation.
    ///
    /// Pending batched commands are abandoned, not flushed: abrupt
    /// teardown must never silently execute half-built state. Idempotent.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.pending.is_empty() {
            tracing::warn!(
                pending = inner.pending.len(),
                "disconnecting with unflushed commands; they will not run"
            );
            inner.pending.clear();
        }
        if inner.transport.take().is_some() {
            if let Some(port) = inner.port.take() {
                self.ports.release(port);
            }
            tracing::debug!("disconnected");
        }
    }

    /// Toggle batched mode.
    ///
    /// Leaving batched mode flushes whatever is queued first, in enqueue
    /// order; entering it never flushes.
    ///
    /// # Errors
    /// Flush failures when leaving batched mode with a non-empty queue.
    pub async fn set_batched(&self, batched: bool) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        match (inner.mode, batched) {
            (Mode::Batched, false) => {
                Self::flush_locked(&mut inner).await?;
                inner.mode = Mode::Immediate;
            }
            (Mode::Immediate, true) => inner.mode = Mode::Batched,
            _ => {}
        }
        Ok(())
    }

    /// Send one command line and block until its complete response.
    ///
    /// # Errors
    /// `NotConnected` without a transport; transport I/O failures.
    pub async fn execute(&self, line: &str) -> Result<String, SessionError> {
        let mut inner = self.inner.lock().await;
        tracing::debug!(command = line, "exec");
        Self::exchange(&mut inner, line).await
    }

    /// Append a command to the pending queue without executing it.
    ///
    /// # Errors
    /// `BadMode` unless batched mode is on.
    pub async fn enqueue(&self, line: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.mode != Mode::Batched {
            return Err(SessionError::BadMode);
        }
        tracing::debug!(command = line, "queue");
        inner.pending.push(line.to_owned());
        Ok(())
    }

    /// Send every queued command as one joined request and clear the
    /// queue. Returns the raw response for the batch.
    ///
    /// # Errors
    /// `BadMode` unless batched mode is on.
    pub async fn flush(&self) -> Result<String, SessionError> {
        let mut inner = self.inner.lock().await;
        Self::flush_locked(&mut inner).await
    }

    /// Route a command according to the current mode: queued under
    /// batching (no response), executed immediately otherwise.
    ///
    /// # Errors
    /// Transport failures in immediate mode.
    pub async fn submit(&self, line: &str) -> Result<Option<String>, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.mode == Mode::Batched {
            tracing::debug!(command = line, "queue");
            inner.pending.push(line.to_owned());
            Ok(None)
        } else {
            tracing::debug!(command = line, "exec");
            Self::exchange(&mut inner, line).await.map(Some)
        }
    }

    /// Execute a command that must see an immediate, decodable response
    /// (introspection cannot be deferred).
    ///
    /// # Errors
    /// `BatchModeActive` while batched mode is on.
    pub async fn execute_immediate(&self, line: &str) -> Result<String, SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.mode == Mode::Batched {
            return Err(SessionError::BatchModeActive);
        }
        tracing::debug!(command = line, "exec");
        Self::exchange(&mut inner, line).await
    }

    async fn flush_locked(inner: &mut Inner) -> Result<String, SessionError> {
        if inner.mode != Mode::Batched {
            return Err(SessionError::BadMode);
        }
        if inner.pending.is_empty() {
            return Ok(String::new());
        }
        let joined = inner.pending.join("\n");
        inner.pending.clear();
        tracing::debug!(bytes = joined.len(), "flushing batched commands");
        Self::exchange(inner, &joined).await
    }

    async fn exchange(inner: &mut Inner, line: &str) -> Result<String, SessionError> {
        let transport = inner.transport.as_mut().ok_or(SessionError::NotConnected)?;
        transport.send_line(line).await?;
        Ok(transport.recv_blob().await?)
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.transport.is_some()
    }

    pub async fn is_batched(&self) -> bool {
        self.inner.lock().await.mode == Mode::Batched
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.pending.len()
    }

    /// Mint a unique alias name for `Ref&`/`Set` declarations.
    pub async fn next_ref_name(&self) -> String {
        let mut inner = self.inner.lock().await;
        inner.ref_counter += 1;
        format!("ref{}", inner.ref_counter)
    }

    /// Cached schema for `path`, if already described this session.
    pub async fn cached_schema(&self, path: &RemotePath) -> Option<NodeSchema> {
        self.inner.lock().await.schemas.get(path).cloned()
    }

    pub async fn cache_schema(&self, path: RemotePath, schema: NodeSchema) {
        self.inner.lock().await.schemas.insert(path, schema);
    }
}

fn resolve_executable(path: &Path) -> Result<PathBuf, SessionError> {
    if path.components().count() > 1 || path.is_absolute() {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(SessionError::ExecutableNotFound(path.display().to_string()));
    }
    which::which(path).map_err(|_| SessionError::ExecutableNotFound(path.display().to_string()))
}
