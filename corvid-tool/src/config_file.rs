//! The declarative tool-configuration file (§6).
//!
//! On first run the file doesn't exist yet; the registry bootstraps it
//! with empty arrays and proceeds rather than failing startup.

use std::path::Path;
use std::sync::Arc;

use corvid_types::ToolDescriptor;
use serde::{Deserialize, Serialize};

use crate::registry::{ToolRegistry, ToolSource};
use crate::user_tool::{UserTool, UserToolConfig};

/// One entry from the `mcp_servers` array — a remote JSON-RPC tool
/// provider to connect during registry load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Human-readable name, used for logging.
    pub name: String,
    /// HTTP base URL or stdio command line, interpreted by the caller.
    pub url: String,
    /// Optional bearer credential for HTTP servers.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Whether this server should be connected at load time.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// The full contents of the tool-configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolConfigFile {
    /// User-declared shell/http/script tools.
    #[serde(default)]
    pub tools: Vec<UserToolConfig>,
    /// Remote tool providers to connect.
    #[serde(default)]
    pub mcp_servers: Vec<McpServerConfig>,
}

/// Read the tool-configuration file at `path`, bootstrapping it with an
/// empty default if it doesn't exist yet. Registers every entry in
/// `tools` into `registry` as [`ToolSource::UserDeclared`] and returns
/// the parsed file (including `mcp_servers`) so the caller can connect
/// remote providers itself.
///
/// Parse failures are reported but do not abort caller startup in the
/// way a missing file doesn't — callers that need hard failure on a
/// malformed file should inspect the returned `Err` themselves.
pub async fn load_user_tools(
    registry: &ToolRegistry,
    path: &Path,
) -> Result<ToolConfigFile, std::io::Error> {
    let config = match tokio::fs::read_to_string(path).await {
        Ok(raw) => serde_json::from_str::<ToolConfigFile>(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "tool configuration file is malformed, using empty defaults");
            ToolConfigFile::default()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "tool configuration file missing, bootstrapping empty defaults");
            let default = ToolConfigFile::default();
            let serialized = serde_json::to_string_pretty(&default).expect("default config is serializable");
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            tokio::fs::write(path, serialized).await?;
            default
        }
        Err(e) => return Err(e),
    };

    for entry in &config.tools {
        let descriptor = ToolDescriptor::new(
            entry.name.clone(),
            entry.description.clone(),
            entry.parameters.clone(),
        );
        registry
            .register(
                descriptor,
                Arc::new(UserTool::new(entry.clone())),
                ToolSource::UserDeclared,
            )
            .await;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstraps_missing_file_with_empty_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        let registry = ToolRegistry::new();

        let config = load_user_tools(&registry, &path).await.unwrap();
        assert!(config.tools.is_empty());
        assert!(config.mcp_servers.is_empty());
        assert!(path.exists());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn registers_user_declared_tools_from_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        tokio::fs::write(
            &path,
            serde_json::json!({
                "tools": [{
                    "name": "greet",
                    "description": "says hi",
                    "parameters": {},
                    "type": "shell",
                    "command": "echo hi ${name}",
                }],
                "mcp_servers": [],
            })
            .to_string(),
        )
        .await
        .unwrap();

        let registry = ToolRegistry::new();
        let config = load_user_tools(&registry, &path).await.unwrap();
        assert_eq!(config.tools.len(), 1);
        assert!(registry.get("greet").await.is_some());
    }
}
