#![deny(missing_docs)]
//! Tool contract, built-in tools, and the composed registry (C1–C3).
//!
//! [`ToolDyn`] is the object-safe call surface every tool source
//! implements — a built-in, a user-declared shell/http/script template,
//! or (from `corvid-mcp`) a wrapper around a remote JSON-RPC tool.
//! [`ToolRegistry`] materializes all three source classes into one
//! name-keyed table.

pub mod builtins;
pub mod config_file;
pub mod context;
pub mod registry;
pub mod user_tool;

pub use config_file::{load_user_tools, McpServerConfig, ToolConfigFile};
pub use context::ToolContext;
pub use registry::{ToolRegistry, ToolSource};
pub use user_tool::{UserTool, UserToolConfig, UserToolType};

use std::future::Future;
use std::pin::Pin;

use corvid_types::ToolError;

/// Object-safe trait for tool implementations.
///
/// Any tool source implements this; tools are stored as `Arc<dyn
/// ToolDyn>` in [`ToolRegistry`]. `call` receives the already-repaired
/// argument object (never the model's raw text).
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// Parameter schema, passed through verbatim into prompts and
    /// remote call envelopes.
    fn parameter_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given input.
    ///
    /// `ctx` carries cancellation and deadline; every executor must
    /// honor cancellation between observable steps (§4.1).
    fn call(
        &self,
        ctx: ToolContext,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>>;
}
