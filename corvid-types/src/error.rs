//! Error taxonomy shared across tool execution, RPC transport, and the
//! reasoning loop.
//!
//! Every variant maps to one of the error kinds enumerated in the core's
//! design: `tool-not-found`, `tool-input-invalid`, `tool-unavailable`,
//! `tool-execution-failed`, `tool-timeout`, `rpc-transport`,
//! `rpc-protocol`, `generator-failed`, `generator-timeout`,
//! `context-cancelled`, `iteration-exhausted`, `loop-detected`,
//! `config-invalid`, `configuration-missing`. `kind()` exposes the
//! stable string so callers can branch on it without matching variants.

use thiserror::Error;

/// Errors from tool execution.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool registered under this name.
    #[error("unknown tool: {0}")]
    NotFound(String),

    /// The arguments given to the tool failed validation or parsing.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The tool exists but cannot run right now (missing evaluator,
    /// disabled backend, etc).
    #[error("tool unavailable: {0}")]
    Unavailable(String),

    /// The tool ran and failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The tool did not finish within its allotted deadline.
    #[error("tool timed out: {0}")]
    Timeout(String),

    /// Catch-all for errors from sources outside this crate family.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ToolError {
    /// Stable kind string used in logs and observation text.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "tool-not-found",
            ToolError::InvalidInput(_) => "tool-input-invalid",
            ToolError::Unavailable(_) => "tool-unavailable",
            ToolError::ExecutionFailed(_) => "tool-execution-failed",
            ToolError::Timeout(_) => "tool-timeout",
            ToolError::Other(_) => "tool-execution-failed",
        }
    }

    /// Whether the error message text contains the "unknown tool"
    /// marker the loop's unknown-tool detector looks for.
    pub fn is_unknown_tool(&self) -> bool {
        matches!(self, ToolError::NotFound(_)) || self.to_string().contains("unknown tool")
    }
}

/// Errors from the JSON-RPC tool client (C4).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum McpError {
    /// Connection establishment, process spawn, or I/O failure.
    #[error("rpc transport error: {0}")]
    Transport(String),

    /// A well-formed response carried a JSON-RPC `error` object, or the
    /// response shape didn't match what was expected.
    #[error("rpc protocol error: {0}")]
    Protocol(String),
}

impl McpError {
    /// Stable kind string.
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::Transport(_) => "rpc-transport",
            McpError::Protocol(_) => "rpc-protocol",
        }
    }
}

impl From<McpError> for ToolError {
    fn from(err: McpError) -> Self {
        // From the model's perspective an RPC failure is just a failed
        // tool call — it surfaces as an observation, not a distinct kind.
        ToolError::ExecutionFailed(err.to_string())
    }
}

/// Errors from the text-generator contract.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The generator call failed (transport error, non-2xx, malformed
    /// response, etc).
    #[error("generator failed: {0}")]
    Failed(String),

    /// The generator did not respond within the per-step timeout.
    #[error("generator timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl ProviderError {
    /// Stable kind string.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Failed(_) => "generator-failed",
            ProviderError::Timeout(_) => "generator-timeout",
        }
    }
}

/// Configuration errors surfaced at load time.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be parsed.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The configuration file was absent and has been bootstrapped.
    #[error("configuration file missing, wrote default at {0}")]
    Missing(String),
}

impl ConfigError {
    /// Stable kind string.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "config-invalid",
            ConfigError::Missing(_) => "configuration-missing",
        }
    }
}

/// Terminal error for a task run by the reasoning loop.
///
/// This is the error a task transitions to `failed` with. It never
/// escapes as a Rust exception across the task boundary — the loop
/// always converts it into task result text (§7's "propagation
/// policy"); `CoreError` exists so internal plumbing has a typed value
/// to carry until that conversion happens.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CoreError {
    /// The task's context was cancelled (caller-initiated or deadline).
    #[error("context cancelled: {0}")]
    ContextCancelled(String),

    /// `max-iterations` was reached without a terminal answer.
    #[error("agent reached maximum iterations ({0}) without completing the task")]
    IterationExhausted(u32),

    /// A loop-breaking heuristic fired.
    #[error("{0}")]
    LoopDetected(String),

    /// The text-generator failed or timed out.
    #[error(transparent)]
    Generator(#[from] ProviderError),

    /// Configuration was invalid or missing.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CoreError {
    /// Stable kind string.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::ContextCancelled(_) => "context-cancelled",
            CoreError::IterationExhausted(_) => "iteration-exhausted",
            CoreError::LoopDetected(_) => "loop-detected",
            CoreError::Generator(e) => e.kind(),
            CoreError::Config(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_kinds() {
        assert_eq!(ToolError::NotFound("x".into()).kind(), "tool-not-found");
        assert_eq!(
            ToolError::InvalidInput("x".into()).kind(),
            "tool-input-invalid"
        );
        assert_eq!(ToolError::Unavailable("x".into()).kind(), "tool-unavailable");
        assert_eq!(
            ToolError::ExecutionFailed("x".into()).kind(),
            "tool-execution-failed"
        );
        assert_eq!(ToolError::Timeout("x".into()).kind(), "tool-timeout");
    }

    #[test]
    fn unknown_tool_detection() {
        let err = ToolError::NotFound("web_search".into());
        assert!(err.is_unknown_tool());
        let err = ToolError::ExecutionFailed("remote said: unknown tool foo".into());
        assert!(err.is_unknown_tool());
        let err = ToolError::ExecutionFailed("disk full".into());
        assert!(!err.is_unknown_tool());
    }

    #[test]
    fn iteration_exhausted_message() {
        let err = CoreError::IterationExhausted(10);
        assert_eq!(
            err.to_string(),
            "agent reached maximum iterations (10) without completing the task"
        );
        assert_eq!(err.kind(), "iteration-exhausted");
    }
}
