//! The composed tool registry (C3).
//!
//! Materializes built-in, user-declared, and remote tools into one
//! name-keyed table. Guarded by a reader/writer lock; `execute` takes
//! only the read lock so concurrent tool calls never block each other
//! on registry access (§5).

use std::collections::HashMap;
use std::sync::Arc;

use corvid_types::{ToolDescriptor, ToolError};
use tokio::sync::RwLock;

use crate::context::ToolContext;
use crate::ToolDyn;

/// Which class of source registered a tool. Used only for override
/// logging — the registry does not treat sources differently at call
/// time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    /// One of the seven built-in implementations (C2).
    Builtin,
    /// A shell/http/script template from the tool-configuration file.
    UserDeclared,
    /// Discovered from a connected JSON-RPC provider.
    Remote,
}

impl std::fmt::Display for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ToolSource::Builtin => "builtin",
            ToolSource::UserDeclared => "user-declared",
            ToolSource::Remote => "remote",
        })
    }
}

struct Entry {
    descriptor: ToolDescriptor,
    executor: Arc<dyn ToolDyn>,
    source: ToolSource,
}

/// Mapping `name -> (descriptor, executor)`.
///
/// Invariant: every name present has exactly one executor; removal is
/// atomic with deregistration. Lifecycle: constructed at server start,
/// mutated only by explicit `register`/`unregister`, destroyed at
/// shutdown.
pub struct ToolRegistry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool. Sources are composed in priority order
    /// (built-ins, then user-declared, then remote); on name collision
    /// the later registration overrides and the override is logged.
    pub async fn register(
        &self,
        descriptor: ToolDescriptor,
        executor: Arc<dyn ToolDyn>,
        source: ToolSource,
    ) {
        let mut entries = self.entries.write().await;
        if let Some(prev) = entries.get(&descriptor.name) {
            tracing::warn!(
                tool = %descriptor.name,
                previous_source = %prev.source,
                new_source = %source,
                "tool registration overrides existing entry"
            );
        }
        entries.insert(
            descriptor.name.clone(),
            Entry {
                descriptor,
                executor,
                source,
            },
        );
    }

    /// Remove a tool. Removal is atomic — a concurrent `get`/`execute`
    /// either sees the old entry or none, never a partial state.
    pub async fn unregister(&self, name: &str) {
        self.entries.write().await.remove(name);
    }

    /// All registered descriptors, for system-prompt synthesis.
    pub async fn list(&self) -> Vec<ToolDescriptor> {
        self.entries
            .read()
            .await
            .values()
            .map(|e| e.descriptor.clone())
            .collect()
    }

    /// Look up a descriptor and executor by name.
    pub async fn get(&self, name: &str) -> Option<(ToolDescriptor, Arc<dyn ToolDyn>)> {
        self.entries
            .read()
            .await
            .get(name)
            .map(|e| (e.descriptor.clone(), Arc::clone(&e.executor)))
    }

    /// Resolve `name` and invoke it with `args`. Takes only the read
    /// lock — the executor clone is cheap (`Arc`) so the lock is
    /// released before the (possibly slow) call runs.
    pub async fn execute(
        &self,
        ctx: ToolContext,
        name: &str,
        args: serde_json::Value,
    ) -> Result<String, ToolError> {
        let executor = {
            let entries = self.entries.read().await;
            match entries.get(name) {
                Some(entry) => Arc::clone(&entry.executor),
                None => return Err(ToolError::NotFound(name.to_string())),
            }
        };
        executor.call(ctx, args).await
    }

    /// Number of registered tools.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the registry has no tools.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ToolContext;
    use std::future::Future;
    use std::pin::Pin;

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes input"
        }
        fn parameter_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        fn call(
            &self,
            _ctx: ToolContext,
            input: serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
            Box::pin(async move { Ok(input.to_string()) })
        }
    }

    #[tokio::test]
    async fn register_and_execute() {
        let registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new("echo", "echoes", serde_json::json!({})),
                Arc::new(EchoTool),
                ToolSource::Builtin,
            )
            .await;
        assert_eq!(registry.len().await, 1);
        let out = registry
            .execute(ToolContext::background(), "echo", serde_json::json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(out, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn execute_unknown_tool_reports_not_found() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute(ToolContext::background(), "nope", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.is_unknown_tool());
    }

    #[tokio::test]
    async fn later_registration_overrides_earlier() {
        let registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new("echo", "v1", serde_json::json!({})),
                Arc::new(EchoTool),
                ToolSource::Builtin,
            )
            .await;
        registry
            .register(
                ToolDescriptor::new("echo", "v2", serde_json::json!({})),
                Arc::new(EchoTool),
                ToolSource::UserDeclared,
            )
            .await;
        assert_eq!(registry.len().await, 1);
        let (descriptor, _) = registry.get("echo").await.unwrap();
        assert_eq!(descriptor.description, "v2");
    }

    #[tokio::test]
    async fn unregister_removes_atomically() {
        let registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new("echo", "v1", serde_json::json!({})),
                Arc::new(EchoTool),
                ToolSource::Builtin,
            )
            .await;
        registry.unregister("echo").await;
        assert!(registry.is_empty().await);
    }
}
