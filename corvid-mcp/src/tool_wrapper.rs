//! Adapts a discovered remote tool to [`corvid_tool::ToolDyn`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use corvid_tool::{ToolContext, ToolDyn};
use corvid_types::{ToolDescriptor, ToolError};

use crate::transport::RpcTransport;

/// A single remote tool, forwarding calls through the session that
/// discovered it.
pub struct RemoteToolWrapper {
    descriptor: ToolDescriptor,
    transport: Arc<dyn RpcTransport>,
}

impl RemoteToolWrapper {
    /// Wrap a discovered descriptor with the transport that owns it.
    pub fn new(descriptor: ToolDescriptor, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            descriptor,
            transport,
        }
    }
}

impl ToolDyn for RemoteToolWrapper {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn parameter_schema(&self) -> serde_json::Value {
        self.descriptor.parameters.clone()
    }

    fn call(
        &self,
        _ctx: ToolContext,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        let arguments = input.as_object().map(|m| serde_json::Value::Object(m.clone()));
        Box::pin(async move {
            self.transport
                .call_tool(&self.descriptor.name, arguments)
                .await
                .map_err(ToolError::from)
        })
    }
}
