//! System-prompt synthesis for each reasoning style (§4.6).

use corvid_types::{ReasoningStyle, ToolDescriptor};

const PROTOCOL: &str = "\
Respond using exactly this line-oriented protocol:

Thought: <your reasoning>
Action: <one tool name, or omit this line if no tool call is needed>
Action_Input: <a single JSON object with the tool's arguments>

After a tool result is shown to you as an Observation, continue with more\n\
Thought/Action/Action_Input lines, or finish with:

Final Answer: <your answer to the user>

Only one Action per response. Never invent a tool name that is not in the list above.";

const WORKED_EXAMPLE: &str = "\
Example:
Thought: I need to compute this before answering.
Action: calculator
Action_Input: {\"expression\": \"2 + 2\"}
Observation: 4
Thought: I have the result.
Final Answer: 4";

/// Build the system prompt from the registry's current descriptors and
/// the configured reasoning style.
///
/// Every prompt enumerates tool names/descriptions/schemas, states the
/// protocol the parser expects, lists the tools that actually exist,
/// and ends with a worked example terminating in `Final Answer:`.
pub fn build_system_prompt(style: ReasoningStyle, descriptors: &[ToolDescriptor]) -> String {
    let mut prompt = String::new();
    prompt.push_str(style_intro(style));
    prompt.push_str("\n\n");

    prompt.push_str("Available tools:\n");
    for descriptor in descriptors {
        prompt.push_str(&format!("- {}: {}\n", descriptor.name, descriptor.description));
        prompt.push_str(&format!("  parameters: {}\n", descriptor.parameters));
        let required = descriptor.required_fields();
        if !required.is_empty() {
            prompt.push_str(&format!("  required: {}\n", required.join(", ")));
        }
    }

    let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    prompt.push_str(&format!(
        "\nThe only tool names that exist are: {}. Do not call any other tool name.\n\n",
        names.join(", ")
    ));

    prompt.push_str(PROTOCOL);
    prompt.push_str("\n\n");
    prompt.push_str(WORKED_EXAMPLE);
    prompt.push('\n');
    prompt
}

fn style_intro(style: ReasoningStyle) -> &'static str {
    match style {
        ReasoningStyle::React => {
            "You are a reasoning agent that alternates between thinking, acting, and observing \
             tool results until you can give a final answer."
        }
        ReasoningStyle::Cot => {
            "You are a reasoning agent. Think step by step in prose before deciding whether a \
             tool call is needed, then follow the protocol below to act or to answer."
        }
        ReasoningStyle::PlanExecute => {
            "You are a reasoning agent. First lay out a short plan for how you will answer, then \
             execute it one step at a time using the protocol below, calling tools as each step \
             requires."
        }
    }
}
