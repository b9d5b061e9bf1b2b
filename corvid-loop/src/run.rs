//! The bounded generate/parse/execute/observe cycle (§4.6).

use corvid_tool::ToolContext;
use corvid_types::{CoreError, GenerateOptions, Message, Provider, ProviderError, Step, StepKind, Task};

use crate::agent::{Agent, AgentState};
use crate::detectors::{synthesize_answer, DetectorOutcome, LoopDetectors};
use crate::prompt::build_system_prompt;

const CONTEXT_CHAR_LIMIT: usize = 6_000;
const CONTEXT_MESSAGE_LIMIT: usize = 6;
const CONTEXT_TRIM_MARKER: &str = "[Previous conversation trimmed for context limit]";
const OBSERVATION_TRUNCATE_LIMIT: usize = 1_000;
const OBSERVATION_TRUNCATE_SUFFIX: &str = "\n... (output truncated)";

/// Run the reasoning loop to completion against `task`, mutating it in
/// place through to a terminal status.
///
/// Never returns a Rust error — every failure mode (generator failure,
/// timeout, iteration exhaustion, cancellation, loop detector) is
/// resolved into the task's own terminal state, per the propagation
/// policy (§7): the task result text carries the story, not an
/// exception unwinding the caller.
pub async fn run<P: Provider>(agent: &Agent<P>, task: &mut Task) {
    task.mark_running();

    let config = task.config.clone();
    let descriptors = agent.registry.list().await;
    let tool_names: Vec<String> = descriptors.iter().map(|d| d.name.clone()).collect();

    let system_prompt = config
        .system_prompt_override
        .clone()
        .unwrap_or_else(|| build_system_prompt(config.reasoning_style, &descriptors));

    let mut messages = vec![Message::system(system_prompt), Message::user(task.prompt.clone())];
    let mut detectors = LoopDetectors::new();
    let mut state = AgentState::Idle;

    for _iteration in 0..config.max_iterations {
        if task.cancel_token.is_cancelled() {
            task.mark_cancelled();
            return;
        }

        prune_context(&mut messages);

        state = AgentState::Thinking;
        let options = GenerateOptions {
            temperature: config.sampling_temperature,
            max_tokens: config.max_output_tokens_per_call,
        };

        let generation = tokio::select! {
            biased;
            () = task.cancel_token.cancelled() => {
                task.mark_cancelled();
                return;
            }
            result = tokio::time::timeout(config.per_step_timeout, agent.provider.generate(&messages, options)) => result,
        };

        let response = match generation {
            Ok(Ok(text)) => text,
            Ok(Err(provider_err)) => {
                fail_task(agent, task, provider_err.kind(), &provider_err.to_string());
                return;
            }
            Err(_elapsed) => {
                let timeout_err = ProviderError::Timeout(config.per_step_timeout);
                fail_task(agent, task, timeout_err.kind(), &timeout_err.to_string());
                return;
            }
        };

        let parsed = corvid_parser::parse(&response);

        if let Some(thought) = &parsed.thought {
            let seq = task.next_sequence_id();
            emit(agent, task, Step::new(seq, StepKind::Thought, thought.clone()));
        }

        if let Some(action_name) = parsed.action.clone() {
            state = AgentState::Executing;

            let raw_input = parsed.action_input_raw.as_deref().unwrap_or("");
            let repaired = corvid_parser::repair_arguments(&action_name, raw_input);
            let tool_args: serde_json::Value =
                serde_json::from_str(&repaired).unwrap_or_else(|_| serde_json::json!({}));

            let seq = task.next_sequence_id();
            let action_step = Step::action(seq, action_name.clone(), tool_args.clone());
            task.push_step(action_step.clone());
            notify(agent, &action_step);
            let action_step_index = task.steps.len() - 1;

            let ctx = ToolContext::new(task.cancel_token.clone());
            let outcome = agent.registry.execute(ctx, &action_name, tool_args.clone()).await;
            state = AgentState::Waiting;

            let (result_text, is_error, is_unknown) = match &outcome {
                Ok(text) => {
                    let is_error = text.starts_with("Error:");
                    let is_unknown = is_error && text.to_ascii_lowercase().contains("unknown tool");
                    (text.clone(), is_error, is_unknown)
                }
                Err(err) => (err.to_string(), true, err.is_unknown_tool()),
            };

            task.steps[action_step_index] = task.steps[action_step_index].clone().with_tool_result(result_text.clone());

            let truncated = truncate_observation(&result_text);
            let obs_seq = task.next_sequence_id();
            let observation_step = Step::new(obs_seq, StepKind::Observation, truncated.clone());
            emit(agent, task, observation_step);

            messages.push(Message::assistant(response.clone()));
            let mut observation_message = format!("Observation: {truncated}");
            if is_unknown {
                observation_message.push_str(&unknown_tool_guidance(&tool_names));
            }
            messages.push(Message::user(observation_message));

            let detector_outcome = if is_error {
                detectors.record_error(&action_name, &tool_args, &result_text, is_unknown)
            } else {
                detectors.record_success(&action_name, &tool_args, &truncated)
            };

            if let Some(outcome) = detector_outcome {
                resolve_detector(agent, task, outcome, &tool_names);
                return;
            }

            continue;
        }

        if let Some(answer) = parsed.answer.clone() {
            emit_answer(agent, task, &answer);
            task.mark_completed(answer);
            return;
        }

        if parsed.thought.is_some() {
            messages.push(Message::assistant(response.clone()));
            messages.push(Message::user(
                "Continue with the next Action, or give your Final Answer.".to_string(),
            ));
            continue;
        }

        task.mark_completed(response.clone());
        return;
    }

    let _ = state;
    let exhausted = CoreError::IterationExhausted(config.max_iterations);
    fail_task(agent, task, exhausted.kind(), &exhausted.to_string());
}

fn emit<P: Provider>(agent: &Agent<P>, task: &mut Task, step: Step) {
    task.push_step(step.clone());
    notify(agent, &step);
}

fn notify<P: Provider>(agent: &Agent<P>, step: &Step) {
    if let Some(callback) = &agent.step_callback {
        callback(step);
    }
}

fn emit_answer<P: Provider>(agent: &Agent<P>, task: &mut Task, message: &str) {
    let seq = task.next_sequence_id();
    emit(agent, task, Step::new(seq, StepKind::Answer, message.to_string()));
}

fn push_error_step<P: Provider>(agent: &Agent<P>, task: &mut Task, kind: &str, message: &str) {
    let seq = task.next_sequence_id();
    let content = format!("[{kind}] {message}");
    emit(agent, task, Step::new(seq, StepKind::Error, content));
}

fn fail_task<P: Provider>(agent: &Agent<P>, task: &mut Task, kind: &str, message: &str) {
    push_error_step(agent, task, kind, message);
    task.mark_failed(message.to_string());
}

fn resolve_detector<P: Provider>(
    agent: &Agent<P>,
    task: &mut Task,
    outcome: DetectorOutcome,
    allowed_tools: &[String],
) {
    match outcome {
        DetectorOutcome::RepeatedError { tool, message } => {
            push_error_step(
                agent,
                task,
                "loop-detected",
                &format!("repeated failures calling {tool}: {message}"),
            );
            let final_message =
                format!("I was unable to complete this task: calling {tool} repeatedly failed with: {message}");
            emit_answer(agent, task, &final_message);
            task.mark_completed(final_message);
        }
        DetectorOutcome::TotalError => {
            push_error_step(agent, task, "loop-detected", "too many tool errors during this task");
            let final_message = "I was unable to complete this task after encountering multiple errors. \
                Please try rephrasing your request."
                .to_string();
            emit_answer(agent, task, &final_message);
            task.mark_completed(final_message);
        }
        DetectorOutcome::UnknownTool => {
            push_error_step(
                agent,
                task,
                "loop-detected",
                "repeated calls to tools that do not exist",
            );
            let final_message = format!(
                "I attempted to use tools that don't exist. The available tools are: {}. \
                Please rephrase your request using one of these.",
                allowed_tools.join(", ")
            );
            emit_answer(agent, task, &final_message);
            task.mark_completed(final_message);
        }
        DetectorOutcome::RepeatedSuccess { tool, result } => {
            let final_message = synthesize_answer(&tool, &result);
            emit_answer(agent, task, &final_message);
            task.mark_completed(final_message);
        }
    }
}

fn truncate_observation(text: &str) -> String {
    if text.chars().count() > OBSERVATION_TRUNCATE_LIMIT {
        let truncated: String = text.chars().take(OBSERVATION_TRUNCATE_LIMIT).collect();
        format!("{truncated}{OBSERVATION_TRUNCATE_SUFFIX}")
    } else {
        text.to_string()
    }
}

fn unknown_tool_guidance(allowed_tools: &[String]) -> String {
    format!(
        "\nThat tool does not exist. Available tools are: {}. Stop, or give a Final Answer.",
        allowed_tools.join(", ")
    )
}

fn prune_context(messages: &mut Vec<Message>) {
    let total_len: usize = messages.iter().map(|m| m.content.len()).sum();
    if total_len > CONTEXT_CHAR_LIMIT && messages.len() > CONTEXT_MESSAGE_LIMIT {
        let system = messages.first().cloned();
        let tail_start = messages.len().saturating_sub(4);
        let tail = messages[tail_start..].to_vec();

        let mut pruned = Vec::with_capacity(2 + tail.len());
        if let Some(system) = system {
            pruned.push(system);
        }
        pruned.push(Message::user(CONTEXT_TRIM_MARKER));
        pruned.extend(tail);

        tracing::info!(
            previous_messages = messages.len(),
            new_messages = pruned.len(),
            "pruned conversation context"
        );
        *messages = pruned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvid_tool::ToolRegistry;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    struct ScriptedProvider {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            }
        }
    }

    impl Provider for ScriptedProvider {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: GenerateOptions,
        ) -> Result<String, ProviderError> {
            let mut responses = self.responses.lock().expect("lock poisoned");
            responses
                .pop_front()
                .ok_or_else(|| ProviderError::Failed("no more scripted responses".into()))
        }
    }

    struct HangingProvider {
        started: Arc<Notify>,
    }

    impl Provider for HangingProvider {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: GenerateOptions,
        ) -> Result<String, ProviderError> {
            self.started.notify_one();
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    async fn registry_with_builtins() -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new();
        corvid_tool::builtins::register_builtins(&registry).await;
        Arc::new(registry)
    }

    fn new_task(prompt: &str) -> Task {
        Task::new(
            corvid_types::TaskId::generate(),
            prompt,
            corvid_types::AgentConfig::default(),
        )
    }

    #[tokio::test]
    async fn arithmetic_single_tool_scenario() {
        let provider = ScriptedProvider::new(&[
            "Thought: use calculator\nAction: calculator\nAction_Input: {\"expression\": \"85 * 0.15\"}",
            "Final Answer: 12.75",
        ]);
        let agent = Agent::new(provider, registry_with_builtins().await);
        let mut task = new_task("What is 15% of 85?");

        run(&agent, &mut task).await;

        assert_eq!(task.status, corvid_types::TaskStatus::Completed);
        assert_eq!(task.result.as_deref(), Some("12.75"));
        let kinds: Vec<StepKind> = task.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![StepKind::Thought, StepKind::Action, StepKind::Observation, StepKind::Answer]
        );
        assert_eq!(task.steps[1].tool_name.as_deref(), Some("calculator"));
        assert_eq!(task.steps[2].content, "12.75");
    }

    #[tokio::test]
    async fn unknown_tool_cutoff_scenario() {
        let scripted = [
            "Action: web_search\nAction_Input: {}",
            "Action: web_search\nAction_Input: {}",
            "Action: web_search\nAction_Input: {}",
        ];
        let provider = ScriptedProvider::new(&scripted);
        let agent = Agent::new(provider, registry_with_builtins().await);
        let mut task = new_task("search something");

        run(&agent, &mut task).await;

        assert_eq!(task.status, corvid_types::TaskStatus::Completed);
        let action_steps = task.steps.iter().filter(|s| s.kind == StepKind::Action).count();
        assert_eq!(action_steps, 3);
        assert!(task
            .steps
            .iter()
            .filter(|s| s.kind == StepKind::Observation)
            .all(|s| s.content.contains("unknown tool")));
        let error_steps: Vec<_> = task.steps.iter().filter(|s| s.kind == StepKind::Error).collect();
        assert_eq!(error_steps.len(), 1);
        assert!(error_steps[0].content.starts_with("[loop-detected]"));
        assert!(task.result.as_ref().unwrap().contains("calculator"));
    }

    #[tokio::test]
    async fn argument_repair_single_quotes_scenario() {
        let provider = ScriptedProvider::new(&[
            "Action: calculator\nAction_Input: {'expression': '2 + 2'}",
            "Final Answer: 4",
        ]);
        let agent = Agent::new(provider, registry_with_builtins().await);
        let mut task = new_task("what is 2+2?");

        run(&agent, &mut task).await;

        let action_step = task.steps.iter().find(|s| s.kind == StepKind::Action).unwrap();
        assert_eq!(
            action_step.tool_args.as_ref().unwrap(),
            &serde_json::json!({"expression": "2 + 2"})
        );
        let observation = task.steps.iter().find(|s| s.kind == StepKind::Observation).unwrap();
        assert_eq!(observation.content, "4");
    }

    #[tokio::test]
    async fn iteration_cap_fails_task() {
        let responses: Vec<&str> = std::iter::repeat("Thought: thinking more").take(10).collect();
        let provider = ScriptedProvider::new(&responses);
        let agent = Agent::new(provider, registry_with_builtins().await);
        let mut task = new_task("never finish");

        run(&agent, &mut task).await;

        assert_eq!(task.status, corvid_types::TaskStatus::Failed);
        assert!(task.error.as_ref().unwrap().contains("maximum iterations"));
        assert_eq!(task.steps.last().unwrap().kind, StepKind::Error);
    }

    #[tokio::test]
    async fn cancellation_mid_generation_stops_the_loop() {
        let started = Arc::new(Notify::new());
        let provider = HangingProvider {
            started: Arc::clone(&started),
        };
        let agent = Agent::new(provider, registry_with_builtins().await);
        let mut task = new_task("hang forever");
        let cancel_token = task.cancel_token.clone();

        let run_future = run(&agent, &mut task);
        tokio::pin!(run_future);

        tokio::select! {
            () = started.notified() => {}
            _ = &mut run_future => panic!("loop returned before cancellation"),
        }
        cancel_token.cancel();
        run_future.await;

        assert_eq!(task.status, corvid_types::TaskStatus::Cancelled);
        assert!(task.steps.is_empty());
    }

    #[test]
    fn context_pruning_fires_on_length_and_message_count() {
        let mut messages = vec![Message::system("sys")];
        for i in 0..7 {
            messages.push(Message::user("x".repeat(1000) + &i.to_string()));
        }
        assert!(messages.len() > CONTEXT_MESSAGE_LIMIT);
        prune_context(&mut messages);
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[1].content, CONTEXT_TRIM_MARKER);
    }

    #[test]
    fn context_pruning_does_not_fire_below_threshold() {
        let mut messages = vec![Message::system("sys"), Message::user("short")];
        prune_context(&mut messages);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn observation_truncation_matches_boundary() {
        let exact = "a".repeat(1000);
        assert_eq!(truncate_observation(&exact), exact);
        let over = "a".repeat(1001);
        let truncated = truncate_observation(&over);
        assert!(truncated.ends_with(OBSERVATION_TRUNCATE_SUFFIX));
        assert_eq!(truncated.chars().count(), 1000 + OBSERVATION_TRUNCATE_SUFFIX.chars().count());
    }
}
