//! Shared result and configuration types for the orchestration modes
//! (§4.7).

use std::time::Duration;

/// Default total deadline applied to an orchestration run.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default quorum fraction for voting mode.
pub const DEFAULT_QUORUM: f64 = 0.5;

/// How `parallel` mode reduces multiple independent results into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    /// Keep the first agent's result.
    First,
    /// Keep the last agent's result.
    Last,
    /// Join every result under a markdown `## <name>` section.
    Combine,
}

/// Deadline shared by every sub-agent dispatched within one
/// orchestration run. A parent orchestrator timeout always supersedes
/// whatever an individual agent's own config would otherwise allow
/// (§5).
#[derive(Debug, Clone, Copy)]
pub struct OrchestrationConfig {
    /// Total wall-clock budget for the whole orchestration.
    pub total_timeout: Duration,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
        }
    }
}

/// One sub-agent's contribution to an orchestration result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResult {
    /// The agent's name.
    pub agent: String,
    /// The task description it was dispatched with, when the mode
    /// assigns per-agent sub-tasks (hierarchy); `None` otherwise.
    pub role: Option<String>,
    /// The agent's response text.
    pub result: String,
}

impl AgentResult {
    /// Build a result with no assigned role.
    pub fn new(agent: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            role: None,
            result: result.into(),
        }
    }

    /// Build a result with an assigned role (the sub-task text it was
    /// dispatched with).
    pub fn with_role(agent: impl Into<String>, role: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            role: Some(role.into()),
            result: result.into(),
        }
    }
}

/// The outcome of one orchestration mode invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationResult {
    /// The orchestration's overall answer.
    pub final_result: String,
    /// Per-sub-agent contributions, in the order the mode defines.
    pub agent_results: Vec<AgentResult>,
}
