#![deny(missing_docs)]
//! Shared data model for the corvid reasoning core.
//!
//! This crate carries no behavior of its own — it is the common
//! vocabulary every other `corvid-*` crate builds on: task/step/message
//! records, agent configuration, typed ids, and the error taxonomy used
//! across tool execution, RPC transport, and the reasoning loop.

pub mod config;
pub mod error;
pub mod id;
pub mod message;
pub mod provider;
pub mod step;
pub mod task;
pub mod timestamp;
pub mod tool;

pub use config::{AgentConfig, ReasoningStyle};
pub use error::{ConfigError, CoreError, McpError, ProviderError, ToolError};
pub use id::TaskId;
pub use message::{Message, Role};
pub use provider::{GenerateOptions, Provider};
pub use step::{Step, StepKind};
pub use task::{Task, TaskStatus};
pub use timestamp::Timestamp;
pub use tool::ToolDescriptor;
