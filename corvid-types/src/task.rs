//! Task lifecycle record owned by the task manager.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;
use crate::id::TaskId;
use crate::step::Step;
use crate::timestamp::Timestamp;

/// A task's current lifecycle state.
///
/// Transitions: created `pending`; transitions to `running` exactly
/// once; transitions to exactly one of the terminal states
/// (`completed`, `failed`, `cancelled`) exactly once. Never resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet started.
    Pending,
    /// The reasoning loop is actively running.
    Running,
    /// Finished with a final answer.
    Completed,
    /// Finished with a terminal error.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl TaskStatus {
    /// Whether this status is one of the three terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// A unit of work tracked by the task manager.
///
/// Steps are only appended while `status == Running`. `cancel_token` is
/// a lifecycle-scoped capability, not a back-reference to the manager —
/// the manager owns tasks, tasks do not reference their manager.
#[derive(Debug, Clone)]
pub struct Task {
    /// Stable identifier assigned at creation.
    pub id: TaskId,
    /// The original prompt the task was created with.
    pub prompt: String,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Resolved agent configuration this task is running under.
    pub config: AgentConfig,
    /// Append-only transcript of reasoning steps.
    pub steps: Vec<Step>,
    /// Final answer text, set only when `status == Completed`.
    pub result: Option<String>,
    /// Error text, set only when `status == Failed`.
    pub error: Option<String>,
    /// When the task was created.
    pub created_at: Timestamp,
    /// When the task transitioned to `running`.
    pub started_at: Option<Timestamp>,
    /// When the task reached a terminal status.
    pub completed_at: Option<Timestamp>,
    /// Fires to request cancellation of the running loop.
    pub cancel_token: CancellationToken,
}

impl Task {
    /// Create a new `pending` task.
    pub fn new(id: TaskId, prompt: impl Into<String>, config: AgentConfig) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            status: TaskStatus::Pending,
            config,
            steps: Vec::new(),
            result: None,
            error: None,
            created_at: Timestamp::now(),
            started_at: None,
            completed_at: None,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Transition to `running`. No-op guard: callers must only call this
    /// once per task.
    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Timestamp::now());
    }

    /// Append a step. Caller is responsible for only calling this while
    /// `status == Running`.
    pub fn push_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Transition to `completed` with a final answer.
    pub fn mark_completed(&mut self, result: impl Into<String>) {
        self.status = TaskStatus::Completed;
        self.result = Some(result.into());
        self.completed_at = Some(Timestamp::now());
    }

    /// Transition to `failed` with an error message.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Timestamp::now());
    }

    /// Transition to `cancelled`.
    pub fn mark_cancelled(&mut self) {
        self.status = TaskStatus::Cancelled;
        self.completed_at = Some(Timestamp::now());
    }

    /// Next sequence id for an appended step (1-based, dense).
    pub fn next_sequence_id(&self) -> u64 {
        self.steps.len() as u64 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        let mut task = Task::new(TaskId::new("t1"), "hello", AgentConfig::default());
        assert_eq!(task.status, TaskStatus::Pending);
        task.mark_running();
        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.started_at.is_some());
        task.mark_completed("done");
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.status.is_terminal());
        assert_eq!(task.result.as_deref(), Some("done"));
    }

    #[test]
    fn sequence_ids_are_dense() {
        let mut task = Task::new(TaskId::new("t1"), "hello", AgentConfig::default());
        assert_eq!(task.next_sequence_id(), 1);
        task.push_step(crate::step::Step::new(1, crate::step::StepKind::Thought, "x"));
        assert_eq!(task.next_sequence_id(), 2);
    }
}
