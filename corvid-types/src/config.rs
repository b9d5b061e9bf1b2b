//! Agent configuration surface.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prompting/loop style, used to select the system-prompt builder.
///
/// Polymorphism over reasoning styles is by tagged variant, not by
/// trait object — there is one loop implementation, parameterized by
/// which prompt and stop-condition vocabulary it emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasoningStyle {
    /// Thought/Action/Action_Input/Observation/Final Answer.
    React,
    /// Chain-of-thought: freer-form reasoning before a final answer.
    Cot,
    /// Plan first, then execute against the plan.
    PlanExecute,
}

impl Default for ReasoningStyle {
    fn default() -> Self {
        ReasoningStyle::React
    }
}

/// Configuration recognized by the reasoning core.
///
/// Any additional knobs a surrounding server exposes are delivered to
/// the generator via its own `options` and are opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AgentConfig {
    /// Upper bound on reasoning-loop iterations.
    pub max_iterations: u32,
    /// Token cap passed to the generator on every call.
    pub max_output_tokens_per_call: u32,
    /// Sampling temperature passed to the generator, in `[0, 2]`.
    pub sampling_temperature: f64,
    /// Wall-clock ceiling on a single generator call. Reset each
    /// iteration; wraps only the generator call, not tool execution.
    #[serde(with = "duration_secs")]
    pub per_step_timeout: Duration,
    /// Whether conversation history persists across tasks for the same
    /// agent.
    pub enable_memory: bool,
    /// Caller-supplied system prompt. When set, the loop skips
    /// synthesizing one from the registry's descriptors.
    pub system_prompt_override: Option<String>,
    /// Which prompt/stop vocabulary the loop uses.
    pub reasoning_style: ReasoningStyle,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            max_output_tokens_per_call: 2048,
            sampling_temperature: 0.7,
            per_step_timeout: Duration::from_secs(5 * 60),
            enable_memory: true,
            system_prompt_override: None,
            reasoning_style: ReasoningStyle::React,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_design() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.max_output_tokens_per_call, 2048);
        assert_eq!(config.sampling_temperature, 0.7);
        assert_eq!(config.per_step_timeout, Duration::from_secs(300));
        assert!(config.enable_memory);
        assert_eq!(config.reasoning_style, ReasoningStyle::React);
    }
}
