//! The append-only step record emitted for every observable reasoning
//! transition.

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// The kind of reasoning transition a step records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Prose reasoning extracted from a generator response.
    Thought,
    /// A tool invocation (name + repaired arguments), later updated with
    /// its result.
    Action,
    /// The (possibly truncated) text returned to the model for a tool
    /// invocation.
    Observation,
    /// The task's final answer.
    Answer,
    /// A loop-breaking heuristic or fatal condition.
    Error,
}

/// One entry in a task's append-only transcript of reasoning steps.
///
/// Invariant: within one task, `sequence_id` values are strictly
/// increasing and dense from 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Position in the task's step sequence, starting at 1.
    pub sequence_id: u64,
    /// What kind of transition this is.
    pub kind: StepKind,
    /// Human-readable content (thought text, observation text, answer
    /// text, or error message).
    pub content: String,
    /// Tool name, present only on `action` steps.
    pub tool_name: Option<String>,
    /// Repaired JSON arguments passed to the tool, present only on
    /// `action` steps.
    pub tool_args: Option<serde_json::Value>,
    /// Raw tool result text, filled in once the invocation completes.
    pub tool_result: Option<String>,
    /// When the step was emitted.
    pub timestamp: Timestamp,
    /// Wall-clock duration, present only on terminal steps (answer,
    /// error) where "how long did this take" is meaningful.
    pub duration_if_terminal: Option<std::time::Duration>,
}

impl Step {
    /// Build a step with no tool fields and no terminal duration set.
    pub fn new(sequence_id: u64, kind: StepKind, content: impl Into<String>) -> Self {
        Self {
            sequence_id,
            kind,
            content: content.into(),
            tool_name: None,
            tool_args: None,
            tool_result: None,
            timestamp: Timestamp::now(),
            duration_if_terminal: None,
        }
    }

    /// Build an `action` step naming the tool and its repaired arguments.
    pub fn action(
        sequence_id: u64,
        tool_name: impl Into<String>,
        tool_args: serde_json::Value,
    ) -> Self {
        let tool_name = tool_name.into();
        Self {
            sequence_id,
            kind: StepKind::Action,
            content: format!("calling {tool_name}"),
            tool_name: Some(tool_name),
            tool_args: Some(tool_args),
            tool_result: None,
            timestamp: Timestamp::now(),
            duration_if_terminal: None,
        }
    }

    /// Attach the tool's result text after invocation.
    pub fn with_tool_result(mut self, result: impl Into<String>) -> Self {
        self.tool_result = Some(result.into());
        self
    }

    /// Mark a step as terminal, recording its duration.
    pub fn with_duration(mut self, duration: std::time::Duration) -> Self {
        self.duration_if_terminal = Some(duration);
        self
    }
}
