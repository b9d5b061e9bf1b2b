//! HTTP transport: one POST per call to a fixed base URL (§4.4).
//!
//! Concurrent calls share the session and use unique
//! atomically-incremented ids. There is no mutex here — only the
//! request-id counter is shared state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use corvid_types::{McpError, ToolDescriptor};
use serde_json::Value;

use crate::envelope::{client_descriptor, RpcRequest, RpcResponse};
use crate::transport::{parse_call_result, parse_tool_list, RpcTransport};

const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Live session against an HTTP JSON-RPC tool provider.
pub struct HttpRpcSession {
    base_url: String,
    bearer: Option<String>,
    client: reqwest::Client,
    next_id: AtomicU64,
    descriptors: RwLock<Vec<ToolDescriptor>>,
}

impl HttpRpcSession {
    /// Open a session against `base_url`, optionally authenticating
    /// with a bearer token.
    pub fn new(base_url: impl Into<String>, bearer: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer,
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            descriptors: RwLock::new(Vec::new()),
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, request: RpcRequest) -> Result<RpcResponse, McpError> {
        let mut builder = self
            .client
            .post(&self.base_url)
            .timeout(CALL_TIMEOUT)
            .json(&request);
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
        response
            .json::<RpcResponse>()
            .await
            .map_err(|e| McpError::Protocol(format!("malformed response: {e}")))
    }

    /// Send `initialize`, then populate the descriptor cache via
    /// `tools/list`. If `initialize` fails, `tools/list` is still
    /// attempted — some providers omit the handshake.
    pub async fn initialize(&self) -> Result<(), McpError> {
        let id = self.next_request_id();
        let request = RpcRequest::new(id, "initialize", client_descriptor());
        let _ = self.send(request).await;
        self.list_tools().await?;
        Ok(())
    }
}

#[async_trait]
impl RpcTransport for HttpRpcSession {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let id = self.next_request_id();
        let request = RpcRequest::new(id, "tools/list", serde_json::json!({}));
        let response = self.send(request).await?;
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
        let response = self.send(request).await?;
        if let Some(error) = response.error {
            return Err(McpError::Protocol(error.message));
        }
        parse_call_result(&response.result.unwrap_or(Value::Null))
    }

    async fn close(&self) -> Result<(), McpError> {
        // Stateless per-call HTTP session — nothing to tear down.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_and_increasing() {
        let session = HttpRpcSession::new("http://localhost", None);
        let a = session.next_request_id();
        let b = session.next_request_id();
        assert!(b > a);
    }
}
