//! JSON-RPC 2.0 envelope, protocol version `2024-11-05` (§4.4).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version this client speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// An outgoing request or notification.
///
/// A request with no `id` field set is not produced by this client —
/// notifications are written as a bare object without an `id` key via
/// [`Notification`] instead, since a JSON-RPC notification is defined
/// by the *absence* of `id`, not by `id: null`.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Request id, unique per session, monotonically increasing.
    pub id: u64,
    /// RPC method name (`initialize`, `tools/list`, `tools/call`).
    pub method: String,
    /// Method parameters.
    pub params: Value,
}

impl RpcRequest {
    /// Build a request envelope.
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// A one-way notification — no response is expected or read.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Notification method name.
    pub method: String,
    /// Method parameters.
    pub params: Value,
}

impl Notification {
    /// Build a notification envelope.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

/// The JSON-RPC error object, present on a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional additional detail.
    #[serde(default)]
    pub data: Option<Value>,
}

/// An incoming response: exactly one of `result`/`error` is present.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    /// Echoed request id.
    #[serde(default)]
    pub id: Option<Value>,
    /// The method's return value, on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// The error object, on failure.
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// The client descriptor sent in `initialize`'s params.
pub fn client_descriptor() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {"name": "corvid", "version": env!("CARGO_PKG_VERSION")},
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_without_extra_fields() {
        let req = RpcRequest::new(1, "tools/list", serde_json::json!({}));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 1);
        assert_eq!(value["method"], "tools/list");
    }

    #[test]
    fn response_distinguishes_result_and_error() {
        let ok: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#).unwrap();
        assert!(ok.result.is_some());
        assert!(ok.error.is_none());

        let err: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"not found"}}"#,
        )
        .unwrap();
        assert!(err.result.is_none());
        assert_eq!(err.error.unwrap().code, -32601);
    }
}
