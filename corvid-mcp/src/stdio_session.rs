//! Stdio transport: one JSON-RPC line per call over a subprocess's
//! stdin/stdout (§4.4).
//!
//! A single mutex guards both the stdin writer and the buffered stdout
//! reader — calls are inherently single-in-flight. `initialize` issues
//! its request through the same locked exchange every call uses, then
//! calls the *public* `list_tools` only after that lock has been
//! released; re-entering `list_tools` while still holding the
//! `initialize` guard would deadlock against `tokio::sync::Mutex`,
//! which is not reentrant.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use corvid_types::{McpError, ToolDescriptor};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::envelope::{client_descriptor, Notification, RpcRequest, RpcResponse};
use crate::transport::{parse_call_result, parse_tool_list, RpcTransport};

struct Io {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Live session against a stdio JSON-RPC tool provider.
pub struct StdioRpcSession {
    io: tokio::sync::Mutex<Io>,
    next_id: AtomicU64,
    descriptors: RwLock<Vec<ToolDescriptor>>,
}

impl StdioRpcSession {
    /// Spawn `command args...` and open a session over its stdio.
    ///
    /// If `command` looks like a bare interpreter name not found on
    /// `PATH` (e.g. a JavaScript launcher), common install locations
    /// are searched before giving up.
    pub async fn spawn(command: &str, args: &[String]) -> Result<Self, McpError> {
        let resolved = resolve_command(command);
        let mut child = Command::new(&resolved)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| McpError::Transport(format!("spawning {resolved:?}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Transport("child has no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Transport("child has no stdout".into()))?;

        Ok(Self {
            io: tokio::sync::Mutex::new(Io {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            }),
            next_id: AtomicU64::new(1),
            descriptors: RwLock::new(Vec::new()),
        })
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Write one request line and read one response line. Holds the
    /// lock only for the duration of this single exchange.
    async fn exchange(&self, request: RpcRequest) -> Result<RpcResponse, McpError> {
        let mut io = self.io.lock().await;
        let mut line = serde_json::to_string(&request)
            .map_err(|e| McpError::Protocol(format!("encoding request: {e}")))?;
        line.push('\n');
        io.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::Transport(format!("writing stdin: {e}")))?;
        io.stdin
            .flush()
            .await
            .map_err(|e| McpError::Transport(format!("flushing stdin: {e}")))?;

        let mut response_line = String::new();
        let bytes_read = io
            .stdout
            .read_line(&mut response_line)
            .await
            .map_err(|e| McpError::Transport(format!("reading stdout: {e}")))?;
        if bytes_read == 0 {
            return Err(McpError::Transport("subprocess closed stdout".into()));
        }
        serde_json::from_str(response_line.trim_end())
            .map_err(|e| McpError::Protocol(format!("malformed response: {e}")))
    }

    async fn notify(&self, notification: Notification) -> Result<(), McpError> {
        let mut io = self.io.lock().await;
        let mut line = serde_json::to_string(&notification)
            .map_err(|e| McpError::Protocol(format!("encoding notification: {e}")))?;
        line.push('\n');
        io.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::Transport(format!("writing stdin: {e}")))?;
        io.stdin
            .flush()
            .await
            .map_err(|e| McpError::Transport(format!("flushing stdin: {e}")))
    }

    /// Send `initialize`, optionally notify `initialized`, then
    /// populate the descriptor cache. If `initialize` fails,
    /// `tools/list` is still attempted.
    pub async fn initialize(&self) -> Result<(), McpError> {
        let id = self.next_request_id();
        let request = RpcRequest::new(id, "initialize", client_descriptor());
        let init_result = self.exchange(request).await;
        if init_result.is_ok() {
            let _ = self
                .notify(Notification::new("notifications/initialized", serde_json::json!({})))
                .await;
        }
        // `exchange`'s lock guard was dropped when it returned above —
        // safe to call the publicly-locking `list_tools` now.
        self.list_tools().await?;
        Ok(())
    }
}

#[async_trait]
impl RpcTransport for StdioRpcSession {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let id = self.next_request_id();
        let request = RpcRequest::new(id, "tools/list", serde_json::json!({}));
        let response = self.exchange(request).await?;
        if let Some(error) = response.error {
            return Err(McpError::Protocol(error.message));
        }
        let tools = parse_tool_list(&response.result.unwrap_or(Value::Null));
        *self.descriptors.write().expect("descriptor lock poisoned") = tools.clone();
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<String, McpError> {
        let id = self.next_request_id();
        let mut params = serde_json::json!({"name": name});
        if let Some(args) = arguments {
            params["arguments"] = args;
        }
        let request = RpcRequest::new(id, "tools/call", params);
        let response = self.exchange(request).await?;
        if let Some(error) = response.error {
            return Err(McpError::Protocol(error.message));
        }
        parse_call_result(&response.result.unwrap_or(Value::Null))
    }

    async fn close(&self) -> Result<(), McpError> {
        let mut io = self.io.lock().await;
        drop(io.stdin.shutdown().await);
        io.child
            .start_kill()
            .map_err(|e| McpError::Transport(format!("killing subprocess: {e}")))?;
        io.child
            .wait()
            .await
            .map_err(|e| McpError::Transport(format!("awaiting subprocess exit: {e}")))?;
        Ok(())
    }
}

/// Resolve `command` against `PATH`, falling back to a short list of
/// common install locations for version-managed interpreters.
fn resolve_command(command: &str) -> PathBuf {
    if command.contains('/') {
        return PathBuf::from(command);
    }
    if let Some(found) = search_path(command) {
        return found;
    }
    for candidate in common_locations(command) {
        if candidate.is_file() {
            return candidate;
        }
    }
    PathBuf::from(command)
}

fn search_path(command: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(command))
        .find(|candidate| candidate.is_file())
}

fn common_locations(command: &str) -> Vec<PathBuf> {
    let mut candidates = vec![
        PathBuf::from("/usr/local/bin").join(command),
        PathBuf::from("/opt/homebrew/bin").join(command),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        candidates.push(home.join(".volta/bin").join(command));
        candidates.push(home.join(".nvm/current/bin").join(command));
        candidates.push(home.join(".local/bin").join(command));
    }
    candidates
}
