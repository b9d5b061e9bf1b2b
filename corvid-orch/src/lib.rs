#![deny(missing_docs)]
//! Task manager and multi-agent orchestration modes (C7).
//!
//! Built on top of the single-agent reasoning loop (C6): a
//! [`manager::TaskManager`] runs one agent against many tasks, while the
//! [`modes`] functions compose several named agents — each wrapped as an
//! [`agent::OrchAgent`] — into one of five coordination patterns.

pub mod agent;
pub mod manager;
pub mod modes;
pub mod types;

pub use agent::{LoopAgent, OrchAgent, SharedAgent};
pub use manager::{terminal_kind, ManagerError, TaskManager, DEFAULT_MAX_PARALLEL};
pub use modes::{debate, hierarchy, parallel, sequential, voting};
pub use types::{AgentResult, Aggregator, OrchestrationConfig, OrchestrationResult, DEFAULT_QUORUM, DEFAULT_TOTAL_TIMEOUT};
