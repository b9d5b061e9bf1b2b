//! Transport-agnostic pieces shared by the HTTP and stdio sessions.

use async_trait::async_trait;
use corvid_types::McpError;
use serde_json::Value;

/// Capability set every remote-tool provider exposes, regardless of
/// transport. Polymorphism here is by capability set, not inheritance.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Discover the provider's tool descriptors.
    async fn list_tools(&self) -> Result<Vec<corvid_types::ToolDescriptor>, McpError>;

    /// Invoke a tool and return its joined text result.
    async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<String, McpError>;

    /// Tear down the connection.
    async fn close(&self) -> Result<(), McpError>;
}

/// Shape of a successful `tools/list` result: `{tools: [...]}`.
pub fn parse_tool_list(result: &Value) -> Vec<corvid_types::ToolDescriptor> {
    result
        .get("tools")
        .and_then(|v| v.as_array())
        .map(|tools| {
            tools
                .iter()
                .map(|t| {
                    corvid_types::ToolDescriptor::new(
                        t.get("name").and_then(|v| v.as_str()).unwrap_or_default(),
                        t.get("description").and_then(|v| v.as_str()).unwrap_or_default(),
                        t.get("inputSchema").cloned().unwrap_or(serde_json::json!({"type": "object"})),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Shape of a `tools/call` result: `{content: [{type, text}, ...],
/// isError?: bool}`. Joins the text segments; when `isError` is true
/// the joined text becomes the error message instead of the success
/// value.
pub fn parse_call_result(result: &Value) -> Result<String, McpError> {
    let joined = result
        .get("content")
        .and_then(|v| v.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(|v| v.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    let is_error = result.get("isError").and_then(|v| v.as_bool()).unwrap_or(false);
    if is_error {
        Err(McpError::Protocol(joined))
    } else {
        Ok(joined)
    }
}
