//! Extracts thought / action / action-input / final-answer from
//! free-form generator output (§4.5).

/// The four values a single generator response can carry. At most one
/// of `action` and `answer` is meaningful to the caller at once — see
/// [`ParsedResponse::effective_answer`] for the precedence rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Accumulated prose reasoning.
    pub thought: Option<String>,
    /// The first captured tool name, if any (stop-words already
    /// filtered to `None`).
    pub action: Option<String>,
    /// Raw (unrepaired) action-input text.
    pub action_input_raw: Option<String>,
    /// The final answer text, if a `Final Answer:`/`Answer:` header was
    /// seen before any other terminal condition.
    pub answer: Option<String>,
}

impl ParsedResponse {
    /// Rule 7's caller-side precedence: an answer is only meaningful
    /// when no action was extracted. A model that both calls a tool
    /// and hallucinates the tool's result must still perform the call.
    pub fn effective_answer(&self) -> Option<&str> {
        if self.action.is_some() {
            None
        } else {
            self.answer.as_deref()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
    Thought,
    Action,
    ActionInput,
    Observation,
    Answer,
}

const HEADERS: &[(&str, Header)] = &[
    ("final answer:", Header::Answer),
    ("answer:", Header::Answer),
    ("action_input:", Header::ActionInput),
    ("action input:", Header::ActionInput),
    ("action:", Header::Action),
    ("thought:", Header::Thought),
    ("observation:", Header::Observation),
];

fn recognize_header(line: &str) -> Option<(Header, &str)> {
    let trimmed = line.trim_start();
    let lower = trimmed.to_ascii_lowercase();
    for (prefix, header) in HEADERS {
        if lower.starts_with(prefix) {
            let remainder = trimmed[prefix.len()..].trim_start();
            return Some((*header, remainder));
        }
    }
    None
}

/// Track JSON brace balance (string/escape aware) while appending a
/// line to the action-input buffer. Returns whether at least one `{`
/// has ever been seen.
fn track_braces(line: &str, depth: &mut i64, in_string: &mut bool, escape: &mut bool, opened: &mut bool) {
    for ch in line.chars() {
        if *escape {
            *escape = false;
            continue;
        }
        match ch {
            '\\' if *in_string => *escape = true,
            '"' => *in_string = !*in_string,
            '{' if !*in_string => {
                *depth += 1;
                *opened = true;
            }
            '}' if !*in_string => *depth -= 1,
            _ => {}
        }
    }
}

/// Parse one generator response into its constituent parts.
///
/// Never fails — malformed or header-less input simply yields a
/// response with only `thought` set (or nothing at all), which the
/// loop's dispatch decision treats as "return the raw response as the
/// final answer" (§4.6 rule 6's fallthrough).
pub fn parse(text: &str) -> ParsedResponse {
    let lines: Vec<&str> = text.lines().collect();

    let mut thought_parts: Vec<String> = Vec::new();
    let mut action_captured = false;
    let mut action: Option<String> = None;
    let mut action_input_started = false;
    let mut input_parts: Vec<String> = Vec::new();
    let mut collecting_input = false;
    let mut brace_depth: i64 = 0;
    let mut in_string = false;
    let mut escape = false;
    let mut opened_any_brace = false;
    let mut answer_parts: Option<Vec<String>> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(parts) = answer_parts.as_mut() {
            if recognize_header(line).is_some() {
                break;
            }
            parts.push(line.to_string());
            i += 1;
            continue;
        }

        if collecting_input {
            match recognize_header(line) {
                Some(_) => collecting_input = false, // fall through to dispatch below
                None => {
                    track_braces(line, &mut brace_depth, &mut in_string, &mut escape, &mut opened_any_brace);
                    input_parts.push(line.to_string());
                    if opened_any_brace && brace_depth <= 0 {
                        collecting_input = false;
                    }
                    i += 1;
                    continue;
                }
            }
        }

        match recognize_header(line) {
            Some((Header::Answer, remainder)) => {
                let mut parts = Vec::new();
                if !remainder.is_empty() {
                    parts.push(remainder.to_string());
                }
                answer_parts = Some(parts);
            }
            Some((Header::Thought, remainder)) => {
                if !remainder.is_empty() {
                    thought_parts.push(remainder.to_string());
                }
            }
            Some((Header::Action, remainder)) => {
                if !action_captured {
                    action_captured = true;
                    let token = remainder.split_whitespace().next().unwrap_or("");
                    let lower = token.to_ascii_lowercase();
                    if !token.is_empty() && !matches!(lower.as_str(), "none" | "n/a" | "null") {
                        action = Some(token.to_string());
                    }
                }
            }
            Some((Header::ActionInput, remainder)) => {
                if action.is_some() && !action_input_started {
                    action_input_started = true;
                    collecting_input = true;
                    track_braces(remainder, &mut brace_depth, &mut in_string, &mut escape, &mut opened_any_brace);
                    input_parts.push(remainder.to_string());
                    if opened_any_brace && brace_depth <= 0 {
                        collecting_input = false;
                    }
                }
            }
            Some((Header::Observation, _)) => {}
            None => {
                if !line.trim().is_empty() {
                    thought_parts.push(line.trim().to_string());
                }
            }
        }
        i += 1;
    }

    ParsedResponse {
        thought: (!thought_parts.is_empty()).then(|| thought_parts.join(" ")),
        action,
        action_input_raw: (!input_parts.is_empty()).then(|| input_parts.join(" ")),
        answer: answer_parts.map(|parts| parts.join("\n")),
    }
}

/// Re-render the parsed parts in canonical section order, so re-parsing
/// the rendering should round-trip on well-formed input (§8).
pub fn render_canonical(parsed: &ParsedResponse) -> String {
    let mut out = String::new();
    if let Some(thought) = &parsed.thought {
        out.push_str("Thought: ");
        out.push_str(thought);
        out.push('\n');
    }
    if let Some(action) = &parsed.action {
        out.push_str("Action: ");
        out.push_str(action);
        out.push('\n');
        if let Some(input) = &parsed.action_input_raw {
            out.push_str("Action_Input: ");
            out.push_str(input);
            out.push('\n');
        }
    }
    if let Some(answer) = &parsed.answer {
        out.push_str("Final Answer: ");
        out.push_str(answer);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_scenario_first_response() {
        let text = "Thought: use calculator\nAction: calculator\nAction_Input: {\"expression\": \"85 * 0.15\"}";
        let parsed = parse(text);
        assert_eq!(parsed.thought.as_deref(), Some("use calculator"));
        assert_eq!(parsed.action.as_deref(), Some("calculator"));
        assert_eq!(
            parsed.action_input_raw.as_deref(),
            Some(r#"{"expression": "85 * 0.15"}"#)
        );
        assert!(parsed.answer.is_none());
    }

    #[test]
    fn final_answer_header() {
        let parsed = parse("Final Answer: 12.75");
        assert_eq!(parsed.answer.as_deref(), Some("12.75"));
        assert_eq!(parsed.effective_answer(), Some("12.75"));
    }

    #[test]
    fn action_precedes_answer_per_rule_seven() {
        let text = "Action: calculator\nAction_Input: {\"expression\": \"1+1\"}\nFinal Answer: 2";
        let parsed = parse(text);
        assert_eq!(parsed.action.as_deref(), Some("calculator"));
        assert_eq!(parsed.answer.as_deref(), Some("2"));
        assert_eq!(parsed.effective_answer(), None);
    }

    #[test]
    fn stopword_actions_are_treated_as_absent() {
        for word in ["none", "None", "N/A", "NULL"] {
            let parsed = parse(&format!("Action: {word}"));
            assert!(parsed.action.is_none(), "expected {word} to mean no action");
        }
    }

    #[test]
    fn action_is_captured_only_once() {
        let parsed = parse("Action: calculator\nAction: shell");
        assert_eq!(parsed.action.as_deref(), Some("calculator"));
    }

    #[test]
    fn action_input_stops_at_next_header() {
        let text = "Action: shell\nAction_Input: echo hi\nObservation: ignored";
        let parsed = parse(text);
        assert_eq!(parsed.action_input_raw.as_deref(), Some("echo hi"));
    }

    #[test]
    fn action_input_collects_multiline_json_until_balanced() {
        let text = "Action: calculator\nAction_Input: {\n  \"expression\":\n  \"1 + 1\"\n}\nThought: done";
        let parsed = parse(text);
        assert_eq!(
            parsed.action_input_raw.as_deref(),
            Some(r#" { "expression": "1 + 1" }"#)
        );
    }

    #[test]
    fn unlabeled_lines_fall_into_thought() {
        let text = "Thought: first\nsome extra commentary\nmore text";
        let parsed = parse(text);
        assert_eq!(parsed.thought.as_deref(), Some("first some extra commentary more text"));
    }

    #[test]
    fn round_trip_on_well_formed_input() {
        let original = parse("Thought: use calculator\nAction: calculator\nAction_Input: {\"expression\": \"1+1\"}");
        let rendered = render_canonical(&original);
        let reparsed = parse(&rendered);
        assert_eq!(original.thought, reparsed.thought);
        assert_eq!(original.action, reparsed.action);
        assert_eq!(original.action_input_raw, reparsed.action_input_raw);
        assert_eq!(original.answer, reparsed.answer);
    }

    #[test]
    fn no_headers_yields_only_thought() {
        let parsed = parse("just some free text with no structure");
        assert_eq!(parsed.thought.as_deref(), Some("just some free text with no structure"));
        assert!(parsed.action.is_none());
        assert!(parsed.answer.is_none());
    }
}
