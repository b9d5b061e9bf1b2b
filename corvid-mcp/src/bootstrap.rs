//! Wires the three tool source classes into one registry at startup
//! (§4.3's "Load-user-tools").

use std::path::Path;
use std::sync::Arc;

use corvid_tool::{McpServerConfig, ToolRegistry, ToolSource};

use crate::http_session::HttpRpcSession;
use crate::stdio_session::StdioRpcSession;
use crate::tool_wrapper::RemoteToolWrapper;
use crate::transport::RpcTransport;

/// Build a fully materialized registry: built-ins, then user-declared
/// tools from the configuration file (bootstrapping it if absent), then
/// remote tools from every enabled, reachable MCP server.
///
/// A remote server that fails to connect is logged and skipped — it
/// must not abort registry construction.
pub async fn bootstrap_registry(config_path: &Path) -> Result<ToolRegistry, std::io::Error> {
    let registry = ToolRegistry::new();
    corvid_tool::builtins::register_builtins(&registry).await;

    let config = corvid_tool::load_user_tools(&registry, config_path).await?;

    for server in config.mcp_servers.iter().filter(|s| s.enabled) {
        if let Err(e) = connect_and_register(&registry, server).await {
            tracing::warn!(server = %server.name, error = %e, "skipping mcp server: connection failed");
        }
    }

    Ok(registry)
}

async fn connect_and_register(
    registry: &ToolRegistry,
    server: &McpServerConfig,
) -> Result<(), corvid_types::McpError> {
    let transport: Arc<dyn RpcTransport> = if server.url.starts_with("http://") || server.url.starts_with("https://") {
        let session = HttpRpcSession::new(server.url.clone(), server.api_key.clone());
        session.initialize().await?;
        Arc::new(session)
    } else {
        let mut parts = server.url.split_whitespace();
        let command = parts
            .next()
            .ok_or_else(|| corvid_types::McpError::Transport("empty stdio command".into()))?;
        let args: Vec<String> = parts.map(str::to_string).collect();
        let session = StdioRpcSession::spawn(command, &args).await?;
        session.initialize().await?;
        Arc::new(session)
    };

    let descriptors = transport.list_tools().await?;
    for descriptor in descriptors {
        registry
            .register(
                descriptor.clone(),
                Arc::new(RemoteToolWrapper::new(descriptor, Arc::clone(&transport))),
                ToolSource::Remote,
            )
            .await;
    }
    Ok(())
}
