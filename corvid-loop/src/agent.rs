//! The `Agent` type: one provider, one registry, one optional step
//! subscriber, driving the reasoning loop for whatever task it is
//! handed (§4.6).

use std::sync::Arc;

use corvid_tool::ToolRegistry;
use corvid_types::{Provider, Step};

/// The loop's coarse internal state, tracked only for logging —
/// translating to a different runtime is straightforward because every
/// `await` sits at one of these named points (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// No generator call or tool dispatch in flight.
    Idle,
    /// Waiting on the generator.
    Thinking,
    /// A tool invocation is in flight.
    Executing,
    /// Between dispatch and the next generator call.
    Waiting,
}

/// Called synchronously for every step the loop emits. Implementations
/// must not block indefinitely — interpose a bounded queue if the
/// subscriber itself needs to do slow work (§5).
pub type StepCallback = Arc<dyn Fn(&Step) + Send + Sync>;

/// Drives the per-iteration generate/parse/execute/observe cycle (C6)
/// for one provider against one tool registry.
///
/// Not generic over reasoning style — style only selects which system
/// prompt [`crate::prompt::build_system_prompt`] synthesizes; the loop
/// itself is the same state machine regardless.
pub struct Agent<P: Provider> {
    pub(crate) provider: P,
    pub(crate) registry: Arc<ToolRegistry>,
    pub(crate) step_callback: Option<StepCallback>,
}

impl<P: Provider> Agent<P> {
    /// Build an agent with no step subscriber.
    pub fn new(provider: P, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            registry,
            step_callback: None,
        }
    }

    /// Attach a step subscriber.
    pub fn with_step_callback(mut self, callback: StepCallback) -> Self {
        self.step_callback = Some(callback);
        self
    }

    /// The registry this agent dispatches tool calls against.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }
}
