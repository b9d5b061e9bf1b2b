//! [`OrchAgent`]: a dyn-compatible seam over [`corvid_loop::Agent`].
//!
//! `corvid_loop::Agent<P>` is generic over `Provider`, which uses RPITIT
//! and so is not itself dyn-compatible. The orchestrator needs to hold
//! a heterogeneous set of named sub-agents — possibly backed by
//! different provider types — in one collection, so we erase the
//! provider type behind an object-safe trait the same way the loop
//! crate erases its own non-dyn-compatible pieces.

use std::sync::Arc;

use async_trait::async_trait;
use corvid_types::{Provider, Task, TaskId};

use corvid_loop::Agent;

/// One named participant in an orchestration.
///
/// `run` never returns a Rust `Err`: it drives the underlying task to
/// one of its terminal states and reports back whichever text a caller
/// of the reasoning loop would see — the final answer, or the failure
/// message — mirroring the loop's own propagation policy of resolving
/// everything into the task record rather than unwinding (§7).
#[async_trait]
pub trait OrchAgent: Send + Sync {
    /// This agent's name, used to label its contribution and to
    /// reference it from orchestration prompts ("Previous analysis from
    /// <name>:").
    fn name(&self) -> &str;

    /// Run one prompt to completion and return its result text.
    async fn run(&self, prompt: &str) -> String;
}

/// Adapts a concrete `corvid_loop::Agent<P>` into an [`OrchAgent`].
pub struct LoopAgent<P: Provider> {
    name: String,
    agent: Agent<P>,
}

impl<P: Provider> LoopAgent<P> {
    /// Wrap a loop agent under the given name.
    pub fn new(name: impl Into<String>, agent: Agent<P>) -> Self {
        Self {
            name: name.into(),
            agent,
        }
    }
}

#[async_trait]
impl<P: Provider + Send + Sync> OrchAgent for LoopAgent<P> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, prompt: &str) -> String {
        let mut task = Task::new(TaskId::generate(), prompt, corvid_types::AgentConfig::default());
        corvid_loop::run(&self.agent, &mut task).await;
        match task.status {
            corvid_types::TaskStatus::Completed => task.result.unwrap_or_default(),
            corvid_types::TaskStatus::Cancelled => "Cancelled before completion.".to_string(),
            _ => task
                .error
                .unwrap_or_else(|| "The agent failed without a specific error.".to_string()),
        }
    }
}

/// A named, type-erased agent handle ready to be held in an
/// orchestration's agent list.
pub type SharedAgent = Arc<dyn OrchAgent>;

#[cfg(test)]
mod tests {
    use super::*;
    use corvid_tool::ToolRegistry;
    use corvid_types::{GenerateOptions, Message, ProviderError};

    struct EchoProvider;

    impl Provider for EchoProvider {
        async fn generate(
            &self,
            messages: &[Message],
            _options: GenerateOptions,
        ) -> Result<String, ProviderError> {
            let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("Final Answer: echoed {prompt}"))
        }
    }

    #[tokio::test]
    async fn loop_agent_reports_name_and_answer() {
        let registry = Arc::new(ToolRegistry::new());
        let agent = Agent::new(EchoProvider, registry);
        let loop_agent = LoopAgent::new("alice", agent);

        assert_eq!(loop_agent.name(), "alice");
        let result = loop_agent.run("hello").await;
        assert!(result.contains("echoed hello"));
    }
}
