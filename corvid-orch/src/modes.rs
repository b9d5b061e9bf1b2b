//! The five multi-agent orchestration modes (§4.7).
//!
//! Each mode takes a slice of named agents and a task prompt and
//! produces one [`OrchestrationResult`]. Every agent dispatch goes
//! through [`OrchAgent::run`], which never raises — a sub-agent's own
//! failure surfaces as ordinary result text, not as an orchestration
//! error. The only Rust errors these functions return are
//! orchestration-level preconditions (too few agents for debate or
//! voting).

use std::collections::HashMap;

use corvid_types::{ConfigError, CoreError};

use crate::agent::SharedAgent;
use crate::types::{AgentResult, Aggregator, OrchestrationResult};

fn too_few_agents(mode: &str, need: usize, got: usize) -> CoreError {
    CoreError::Config(ConfigError::Invalid(format!(
        "{mode} requires at least {need} agents, got {got}"
    )))
}

/// Each agent sees the original prompt plus a running digest of every
/// prior agent's answer; the final result is the last agent's answer.
pub async fn sequential(agents: &[SharedAgent], prompt: &str) -> Result<OrchestrationResult, CoreError> {
    let mut agent_results = Vec::with_capacity(agents.len());
    let mut running_prompt = prompt.to_string();

    for agent in agents {
        let result = agent.run(&running_prompt).await;
        running_prompt = format!(
            "{prompt}\n\nPrevious analysis from {}:\n{result}",
            agent.name()
        );
        agent_results.push(AgentResult::new(agent.name(), result));
    }

    let final_result = agent_results
        .last()
        .map(|r| r.result.clone())
        .unwrap_or_default();

    Ok(OrchestrationResult {
        final_result,
        agent_results,
    })
}

/// Every agent receives the same unmodified prompt and runs
/// concurrently; the results are reduced by `aggregator`.
pub async fn parallel(
    agents: &[SharedAgent],
    prompt: &str,
    aggregator: Aggregator,
) -> Result<OrchestrationResult, CoreError> {
    let mut handles = Vec::with_capacity(agents.len());
    for agent in agents {
        let agent = agent.clone();
        let prompt = prompt.to_string();
        handles.push(tokio::spawn(async move {
            let result = agent.run(&prompt).await;
            (agent.name().to_string(), result)
        }));
    }

    let mut agent_results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok((name, result)) => agent_results.push(AgentResult::new(name, result)),
            Err(join_err) => agent_results.push(AgentResult::new(
                "unknown",
                format!("agent task panicked: {join_err}"),
            )),
        }
    }

    let final_result = match aggregator {
        Aggregator::First => agent_results.first().map(|r| r.result.clone()).unwrap_or_default(),
        Aggregator::Last => agent_results.last().map(|r| r.result.clone()).unwrap_or_default(),
        Aggregator::Combine => agent_results
            .iter()
            .map(|r| format!("## {}\n{}", r.agent, r.result))
            .collect::<Vec<_>>()
            .join("\n\n"),
    };

    Ok(OrchestrationResult {
        final_result,
        agent_results,
    })
}

/// Agents argue their position over `max_rounds`, each round seeing
/// every other agent's prior-round position, then one synthesizer
/// (the first agent, absent an explicit choice) produces the final
/// answer from the full transcript.
pub async fn debate(
    agents: &[SharedAgent],
    prompt: &str,
    max_rounds: u32,
    synthesizer: Option<&str>,
) -> Result<OrchestrationResult, CoreError> {
    if agents.len() < 2 {
        return Err(too_few_agents("debate", 2, agents.len()));
    }

    let mut positions: Vec<String> = vec![String::new(); agents.len()];

    for round in 1..=max_rounds.max(1) {
        let mut next_positions = Vec::with_capacity(agents.len());
        for (i, agent) in agents.iter().enumerate() {
            let round_prompt = if round == 1 {
                format!("{prompt}\n\nState your initial position.")
            } else {
                let others = agents
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(j, a)| format!("{}: {}", a.name(), positions[j]))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                format!(
                    "{prompt}\n\nYour previous position:\n{}\n\nOther agents' positions:\n{others}\n\nRespond to their points and refine your position.",
                    positions[i]
                )
            };
            next_positions.push(agent.run(&round_prompt).await);
        }
        positions = next_positions;
    }

    let agent_results: Vec<AgentResult> = agents
        .iter()
        .zip(positions.iter())
        .map(|(agent, position)| AgentResult::new(agent.name(), position.clone()))
        .collect();

    let synthesizer_agent = match synthesizer {
        Some(name) => agents
            .iter()
            .find(|a| a.name() == name)
            .unwrap_or(&agents[0]),
        None => &agents[0],
    };

    let transcript = agent_results
        .iter()
        .map(|r| format!("{}: {}", r.agent, r.result))
        .collect::<Vec<_>>()
        .join("\n\n");
    let synthesis_prompt =
        format!("{prompt}\n\nFinal positions from the debate:\n{transcript}\n\nSynthesize a final answer.");
    let final_result = synthesizer_agent.run(&synthesis_prompt).await;

    Ok(OrchestrationResult {
        final_result,
        agent_results,
    })
}

/// Every agent answers independently, then votes for the answer it
/// thinks is best after seeing every answer; the winner's answer is
/// the final result unless it falls short of `quorum`.
pub async fn voting(
    agents: &[SharedAgent],
    prompt: &str,
    quorum: f64,
) -> Result<OrchestrationResult, CoreError> {
    if agents.len() < 2 {
        return Err(too_few_agents("voting", 2, agents.len()));
    }

    let mut agent_results = Vec::with_capacity(agents.len());
    for agent in agents {
        let result = agent.run(prompt).await;
        agent_results.push(AgentResult::new(agent.name(), result));
    }

    let ballot = agent_results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}) {}: {}", i + 1, r.agent, r.result))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut votes: HashMap<usize, u32> = HashMap::new();
    for agent in agents {
        let vote_prompt = format!(
            "{prompt}\n\nHere are the candidate answers:\n{ballot}\n\nReply with only the number of the best answer."
        );
        let raw_vote = agent.run(&vote_prompt).await;
        if let Some(choice) = parse_vote(&raw_vote, agent_results.len()) {
            *votes.entry(choice).or_insert(0) += 1;
        }
    }

    let (winner_index, winner_votes) = votes
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(index, count)| (*index, *count))
        .unwrap_or((0, 0));

    let consensus = winner_votes as f64 / agents.len() as f64;
    let winner_answer = agent_results
        .get(winner_index)
        .map(|r| r.result.clone())
        .unwrap_or_default();

    let final_result = if consensus < quorum {
        format!(
            "No consensus reached ({winner_votes}/{} votes for the leading answer): {winner_answer}",
            agents.len()
        )
    } else {
        winner_answer
    };

    Ok(OrchestrationResult {
        final_result,
        agent_results,
    })
}

fn parse_vote(raw: &str, candidate_count: usize) -> Option<usize> {
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        raw.chars()
            .find(|c| c.is_ascii_digit())
            .and_then(|c| c.to_digit(10))
            .map(|d| d as usize - 1)
            .filter(|&i| i < candidate_count)
    } else {
        digits
            .parse::<usize>()
            .ok()
            .map(|n| n.saturating_sub(1))
            .filter(|&i| i < candidate_count)
    }
}

#[derive(serde::Deserialize)]
struct WorkPlan {
    subtasks: Vec<Subtask>,
}

#[derive(serde::Deserialize)]
struct Subtask {
    agent: String,
    task: String,
}

/// A supervisor (explicit or the first agent) drafts a JSON work plan
/// assigning a sub-task to each named worker; if the plan can't be
/// parsed, falls back to running every agent in parallel on the
/// original prompt.
pub async fn hierarchy(
    agents: &[SharedAgent],
    prompt: &str,
    supervisor: Option<&str>,
) -> Result<OrchestrationResult, CoreError> {
    let supervisor_agent = match supervisor {
        Some(name) => agents.iter().find(|a| a.name() == name).unwrap_or(&agents[0]),
        None => &agents[0],
    };

    let worker_names = agents
        .iter()
        .map(|a| a.name())
        .collect::<Vec<_>>()
        .join(", ");
    let plan_prompt = format!(
        "{prompt}\n\nYou are coordinating these workers: {worker_names}.\n\
        Respond with a JSON object of the form \
        {{\"subtasks\": [{{\"agent\": \"<name>\", \"task\": \"<what they should do>\"}}]}} \
        assigning each worker exactly one sub-task."
    );
    let plan_response = supervisor_agent.run(&plan_prompt).await;

    let plan = corvid_parser::extract_json_object(&plan_response)
        .and_then(|json| serde_json::from_str::<WorkPlan>(&json).ok());

    let Some(plan) = plan else {
        tracing::info!("hierarchy mode failed to parse a work plan, falling back to parallel");
        return parallel(agents, prompt, Aggregator::Combine).await;
    };

    let mut agent_results = Vec::with_capacity(plan.subtasks.len());
    for subtask in &plan.subtasks {
        let Some(worker) = agents.iter().find(|a| a.name() == subtask.agent) else {
            continue;
        };
        let result = worker.run(&subtask.task).await;
        agent_results.push(AgentResult::with_role(worker.name(), subtask.task.clone(), result));
    }

    let digest = agent_results
        .iter()
        .map(|r| format!("{}: {}", r.agent, r.result))
        .collect::<Vec<_>>()
        .join("\n\n");
    let synthesis_prompt = format!("{prompt}\n\nWorker results:\n{digest}\n\nGive the final answer.");
    let final_result = supervisor_agent.run(&synthesis_prompt).await;

    Ok(OrchestrationResult {
        final_result,
        agent_results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubAgent {
        name: String,
        reply: String,
    }

    #[async_trait]
    impl crate::agent::OrchAgent for StubAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, _prompt: &str) -> String {
            self.reply.clone()
        }
    }

    fn stub(name: &str, reply: &str) -> SharedAgent {
        Arc::new(StubAgent {
            name: name.to_string(),
            reply: reply.to_string(),
        })
    }

    #[tokio::test]
    async fn sequential_chains_prior_answers_and_returns_the_last() {
        let agents = vec![stub("a", "first take"), stub("b", "second take")];
        let result = sequential(&agents, "summarize this").await.unwrap();
        assert_eq!(result.final_result, "second take");
        assert_eq!(result.agent_results.len(), 2);
    }

    #[tokio::test]
    async fn parallel_combine_joins_all_results() {
        let agents = vec![stub("a", "alpha"), stub("b", "beta")];
        let result = parallel(&agents, "go", Aggregator::Combine).await.unwrap();
        assert!(result.final_result.contains("## a\nalpha"));
        assert!(result.final_result.contains("## b\nbeta"));
    }

    #[tokio::test]
    async fn parallel_first_keeps_only_the_first_agent() {
        let agents = vec![stub("a", "alpha"), stub("b", "beta")];
        let result = parallel(&agents, "go", Aggregator::First).await.unwrap();
        assert_eq!(result.final_result, "alpha");
    }

    #[tokio::test]
    async fn debate_requires_at_least_two_agents() {
        let agents = vec![stub("a", "alpha")];
        let err = debate(&agents, "go", 2, None).await.unwrap_err();
        assert_eq!(err.kind(), "config-invalid");
    }

    #[tokio::test]
    async fn debate_synthesizes_from_first_agent_by_default() {
        let agents = vec![stub("a", "position a"), stub("b", "position b")];
        let result = debate(&agents, "go", 1, None).await.unwrap();
        assert_eq!(result.final_result, "position a");
        assert_eq!(result.agent_results.len(), 2);
    }

    #[tokio::test]
    async fn voting_requires_at_least_two_agents() {
        let agents = vec![stub("a", "alpha")];
        let err = voting(&agents, "go", 0.5).await.unwrap_err();
        assert_eq!(err.kind(), "config-invalid");
    }

    #[tokio::test]
    async fn voting_below_quorum_notes_no_consensus() {
        struct SplitAgent {
            name: String,
            calls: std::sync::atomic::AtomicU32,
        }

        #[async_trait]
        impl crate::agent::OrchAgent for SplitAgent {
            fn name(&self) -> &str {
                &self.name
            }

            async fn run(&self, prompt: &str) -> String {
                if prompt.contains("candidate answers") {
                    let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    (n % 3 + 1).to_string()
                } else {
                    format!("answer from {}", self.name)
                }
            }
        }
        let agents: Vec<SharedAgent> = vec![
            Arc::new(SplitAgent {
                name: "a".into(),
                calls: Default::default(),
            }),
            Arc::new(SplitAgent {
                name: "b".into(),
                calls: Default::default(),
            }),
            Arc::new(SplitAgent {
                name: "c".into(),
                calls: Default::default(),
            }),
        ];
        let result = voting(&agents, "go", 0.5).await.unwrap();
        assert!(result.final_result.starts_with("No consensus reached"));
    }

    #[tokio::test]
    async fn hierarchy_falls_back_to_parallel_on_unparseable_plan() {
        let agents = vec![stub("a", "not json at all"), stub("b", "also not json")];
        let result = hierarchy(&agents, "go", None).await.unwrap();
        assert!(result.final_result.contains("## a"));
    }

    #[tokio::test]
    async fn hierarchy_dispatches_subtasks_from_the_work_plan() {
        struct PlanningSupervisor;

        #[async_trait]
        impl crate::agent::OrchAgent for PlanningSupervisor {
            fn name(&self) -> &str {
                "boss"
            }

            async fn run(&self, prompt: &str) -> String {
                if prompt.contains("coordinating") {
                    "here is the plan {\"subtasks\": [{\"agent\": \"worker\", \"task\": \"say hi\"}]} thanks".to_string()
                } else {
                    "final synthesis".to_string()
                }
            }
        }
        let agents: Vec<SharedAgent> = vec![Arc::new(PlanningSupervisor), stub("worker", "hi there")];
        let result = hierarchy(&agents, "go", Some("boss")).await.unwrap();
        assert_eq!(result.final_result, "final synthesis");
        assert_eq!(result.agent_results.len(), 1);
        assert_eq!(result.agent_results[0].agent, "worker");
        assert_eq!(result.agent_results[0].role.as_deref(), Some("say hi"));
    }
}
