//! Client for issuing commands to the fleet daemon over its Unix socket.
//!
//! The daemon listens on a Unix domain socket, `${FLEET_HOME}/daemon.sock` by
//! default. Each call opens a fresh connection, writes one JSON request
//! terminated by a newline, and reads one JSON response:
//!
//! ```json
//! // Request
//! {"command":"list_agents","args":{"repo":"api"}}
//! // Response
//! {"success":true,"data":{"supervisor":{"type":"supervisor","pid":100}}}
//! ```
//!
//! The response carries no guaranteed trailing delimiter, so the reader
//! accumulates bytes and attempts a full decode after every chunk; the first
//! successful decode completes the call. One timeout budget covers the whole
//! exchange (connect, write, read), and exactly one of success, error, or
//! timeout terminates each call, and the connection is dropped in all three.
//!
//! No retries happen here; retry policy belongs to the caller.
//!
//! # Platform Notes
//!
//! Unix domain sockets only exist on Unix platforms. On other platforms every
//! call fails with [`ClientError::Unsupported`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::debug;

use crate::schema::{
    self, Agent, DaemonStatus, Message, Repository, SchemaError, SocketRequest, SocketResponse,
    State, TaskHistoryEntry, TaskStatus,
};

/// Timeout applied when [`ClientConfig`] does not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a [`DaemonClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Socket the daemon listens on
    pub socket_path: PathBuf,
    /// Budget for one whole send/receive exchange
    pub timeout: Duration,
}

impl ClientConfig {
    /// Settings for a daemon socket at `socket_path` with the default timeout.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        ClientConfig {
            socket_path: socket_path.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Failure modes surfaced by [`DaemonClient::send`] and the typed wrappers.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No socket file at the expected endpoint; the daemon never started or
    /// cleaned up after itself.
    #[error("daemon not reachable: no socket at {}", .0.display())]
    NotReachable(PathBuf),

    /// The socket file exists but nothing accepts connections on it; the
    /// daemon likely crashed and left the file behind.
    #[error("connection refused at {}", .0.display())]
    Refused(PathBuf),

    /// The exchange did not complete within the configured budget.
    #[error("daemon did not respond within {0:?}")]
    Timeout(Duration),

    /// The connection closed before the accumulated bytes decoded to a
    /// response envelope.
    #[error("malformed response from daemon: {0}")]
    Malformed(String),

    /// Well-formed failure response; the daemon's message is forwarded
    /// verbatim.
    #[error("daemon error: {0}")]
    Daemon(String),

    /// The response decoded but its `data` payload had the wrong shape.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Failed to encode the outgoing request.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// Transport-level I/O failure mid-exchange.
    #[error("i/o error talking to daemon: {0}")]
    Io(#[from] std::io::Error),

    /// Unix domain sockets are unavailable on this platform.
    #[error("unix domain sockets are not supported on this platform")]
    Unsupported,
}

/// Arguments for spawning a worker agent.
#[derive(Debug, Clone, Default)]
pub struct SpawnRequest {
    /// Task description handed to the worker
    pub task: String,
    /// Repository to spawn in; the daemon's current repo when omitted
    pub repo: Option<String>,
    /// Branch to base the work on
    pub branch: Option<String>,
    /// Remote to push the result to
    pub push_to: Option<String>,
}

impl SpawnRequest {
    /// A spawn request with only a task, targeting the daemon's current repo.
    pub fn new(task: impl Into<String>) -> Self {
        SpawnRequest {
            task: task.into(),
            ..Default::default()
        }
    }
}

/// One-connection-per-call command channel to the fleet daemon.
///
/// The client holds no connection state; cloning it is cheap and calls on the
/// same instance are independent.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    config: ClientConfig,
}

impl DaemonClient {
    /// Build a client from explicit connection settings.
    pub fn new(config: ClientConfig) -> Self {
        DaemonClient { config }
    }

    /// Convenience constructor: default settings for a socket path.
    pub fn at(socket_path: impl Into<PathBuf>) -> Self {
        DaemonClient::new(ClientConfig::new(socket_path))
    }

    /// Socket path this client talks to.
    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Send one command and return the response `data` payload.
    ///
    /// `data` is JSON `null` for commands that succeed without a payload.
    ///
    /// # Errors
    ///
    /// See [`ClientError`]; a `success: false` envelope surfaces as
    /// [`ClientError::Daemon`] with the daemon's message forwarded verbatim.
    pub async fn send(
        &self,
        command: &str,
        args: Option<Map<String, Value>>,
    ) -> Result<Value, ClientError> {
        let request = match args {
            Some(args) => SocketRequest::with_args(command, args),
            None => SocketRequest::bare(command),
        };

        debug!(command, "sending daemon command");
        let response = match tokio::time::timeout(self.config.timeout, self.exchange(&request)).await
        {
            Ok(result) => result?,
            Err(_) => return Err(ClientError::Timeout(self.config.timeout)),
        };

        if !response.success {
            return Err(ClientError::Daemon(
                response
                    .error
                    .unwrap_or_else(|| "unknown daemon error".to_string()),
            ));
        }
        Ok(response.data.unwrap_or(Value::Null))
    }

    // ── Core commands ────────────────────────────────────────────────────────

    /// Liveness probe; any failure reads as "not alive".
    pub async fn ping(&self) -> bool {
        self.send("ping", None).await.is_ok()
    }

    /// Daemon status summary.
    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        let data = self.send("status", None).await?;
        Ok(schema::parse_daemon_status(data)?)
    }

    /// The entire state snapshot, fetched over the socket rather than from
    /// the state file.
    pub async fn state(&self) -> Result<State, ClientError> {
        let data = self.send("get_state", None).await?;
        Ok(schema::parse_state(data)?)
    }

    /// Ask the daemon to shut down.
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.send("stop", None).await.map(|_| ())
    }

    // ── Repository commands ──────────────────────────────────────────────────

    /// Names of all tracked repositories.
    pub async fn list_repos(&self) -> Result<Vec<String>, ClientError> {
        let data = self.send("list_repos", None).await?;
        if data.is_null() {
            return Ok(Vec::new());
        }
        decode_payload("repository name list", data)
    }

    /// A single repository's state.
    pub async fn repo(&self, name: &str) -> Result<Repository, ClientError> {
        let data = self.send("get_repo", Some(args([("name", json!(name))]))).await?;
        Ok(schema::parse_repository(data)?)
    }

    // ── Agent commands ───────────────────────────────────────────────────────

    /// Agents of one repository, or of the current repository when `repo` is
    /// omitted.
    pub async fn list_agents(
        &self,
        repo: Option<&str>,
    ) -> Result<BTreeMap<String, Agent>, ClientError> {
        let args = repo.map(|repo| args([("repo", json!(repo))]));
        let data = self.send("list_agents", args).await?;
        if data.is_null() {
            return Ok(BTreeMap::new());
        }
        decode_payload("agent map", data)
    }

    /// Spawn a worker; returns the name the daemon assigned it.
    pub async fn spawn_worker(&self, spawn: &SpawnRequest) -> Result<String, ClientError> {
        let mut map = Map::new();
        map.insert("task".to_string(), json!(spawn.task));
        if let Some(repo) = &spawn.repo {
            map.insert("repo".to_string(), json!(repo));
        }
        if let Some(branch) = &spawn.branch {
            map.insert("branch".to_string(), json!(branch));
        }
        if let Some(push_to) = &spawn.push_to {
            map.insert("push_to".to_string(), json!(push_to));
        }

        let data = self.send("spawn_worker", Some(map)).await?;
        Ok(data
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Remove an agent by name, optionally scoped to a repository.
    pub async fn remove_agent(&self, name: &str, repo: Option<&str>) -> Result<(), ClientError> {
        let mut map = Map::new();
        map.insert("name".to_string(), json!(name));
        if let Some(repo) = repo {
            map.insert("repo".to_string(), json!(repo));
        }
        self.send("remove_agent", Some(map)).await.map(|_| ())
    }

    /// Ask the daemon to sweep settled workers.
    pub async fn cleanup(&self) -> Result<(), ClientError> {
        self.send("cleanup", None).await.map(|_| ())
    }

    // ── Task history ─────────────────────────────────────────────────────────

    /// Completed task history, newest filters applied daemon-side.
    pub async fn task_history(
        &self,
        repo: Option<&str>,
        limit: Option<usize>,
        status: Option<TaskStatus>,
    ) -> Result<Vec<TaskHistoryEntry>, ClientError> {
        let mut map = Map::new();
        if let Some(repo) = repo {
            map.insert("repo".to_string(), json!(repo));
        }
        if let Some(limit) = limit {
            map.insert("limit".to_string(), json!(limit));
        }
        if let Some(status) = status {
            map.insert("status".to_string(), json!(status.as_str()));
        }

        let args = if map.is_empty() { None } else { Some(map) };
        let data = self.send("task_history", args).await?;
        if data.is_null() {
            return Ok(Vec::new());
        }
        decode_payload("task history", data)
    }

    // ── Message commands ─────────────────────────────────────────────────────

    /// Send a message to an agent; returns the message id.
    pub async fn send_message(
        &self,
        to: &str,
        body: &str,
        from: &str,
    ) -> Result<String, ClientError> {
        let data = self
            .send(
                "send_message",
                Some(args([
                    ("to", json!(to)),
                    ("body", json!(body)),
                    ("from", json!(from)),
                ])),
            )
            .await?;
        Ok(data
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    /// Pending messages known to the daemon, optionally for one agent.
    pub async fn list_messages(&self, agent: Option<&str>) -> Result<Vec<Message>, ClientError> {
        let args = agent.map(|agent| args([("agent", json!(agent))]));
        let data = self.send("list_messages", args).await?;
        if data.is_null() {
            return Ok(Vec::new());
        }
        decode_payload("message list", data)
    }

    /// Ask the daemon to route queued messages now.
    pub async fn route_messages(&self) -> Result<(), ClientError> {
        self.send("route_messages", None).await.map(|_| ())
    }

    // ── Transport ────────────────────────────────────────────────────────────

    #[cfg(unix)]
    async fn exchange(&self, request: &SocketRequest) -> Result<SocketResponse, ClientError> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::UnixStream;

        let socket_path = &self.config.socket_path;
        if !socket_path.exists() {
            return Err(ClientError::NotReachable(socket_path.clone()));
        }

        let mut stream = match UnixStream::connect(socket_path).await {
            Ok(stream) => stream,
            Err(err) if err.kind() == std::io::ErrorKind::ConnectionRefused => {
                return Err(ClientError::Refused(socket_path.clone()));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ClientError::NotReachable(socket_path.clone()));
            }
            Err(err) => return Err(ClientError::Io(err)),
        };

        let mut request_line = serde_json::to_vec(request).map_err(ClientError::Encode)?;
        request_line.push(b'\n');
        stream.write_all(&request_line).await?;
        stream.flush().await?;

        // No length prefix and no guaranteed trailing delimiter: completion
        // is detected by a successful decode after each chunk.
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                let detail = if buf.is_empty() {
                    "connection closed before any response bytes arrived".to_string()
                } else {
                    format!("connection closed after {} undecodable bytes", buf.len())
                };
                return Err(ClientError::Malformed(detail));
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Ok(response) = serde_json::from_slice::<SocketResponse>(&buf) {
                return Ok(response);
            }
        }
    }

    #[cfg(not(unix))]
    async fn exchange(&self, _request: &SocketRequest) -> Result<SocketResponse, ClientError> {
        Err(ClientError::Unsupported)
    }
}

fn args<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn decode_payload<T: DeserializeOwned>(
    expected: &'static str,
    data: Value,
) -> Result<T, ClientError> {
    serde_json::from_value(data)
        .map_err(|source| ClientError::Schema(SchemaError::new(expected, source)))
}

// ── Tests ────────────────────────────────────────────────────────────────────
