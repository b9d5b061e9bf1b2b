//! Loop-breaking heuristics (§4.6), task-scoped across one run.
//!
//! Hard invariants: a task can never spin forever retrying the same
//! failing call, racking up unrelated errors, or churning on a tool the
//! registry doesn't have. Each detector is cheap to evaluate after every
//! dispatch and fires before the next generator call is issued.

use serde_json::Value;

const REPEATED_ERROR_THRESHOLD: u32 = 2;
const TOTAL_ERROR_THRESHOLD: u32 = 5;
const UNKNOWN_TOOL_THRESHOLD: u32 = 3;
const REPEATED_SUCCESS_THRESHOLD: u32 = 3;

/// A loop-breaking heuristic that fired, with the context needed to
/// produce the user-facing message or synthesized answer.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorOutcome {
    /// Same tool + same arguments failed consecutively.
    RepeatedError { tool: String, message: String },
    /// Five or more errors total during the task.
    TotalError,
    /// Three or more calls whose errors indicated an unknown tool.
    UnknownTool,
    /// Same tool succeeded three or more times in a row; synthesize an
    /// answer from the last result rather than keep looping.
    RepeatedSuccess { tool: String, result: String },
}

/// Task-scoped counters and "last-seen" slots for the loop-breaking
/// heuristics. One instance per running task.
#[derive(Debug, Default)]
pub struct LoopDetectors {
    last_error_call: Option<(String, Value)>,
    consecutive_errors: u32,
    total_errors: u32,
    consecutive_unknown_tool: u32,
    last_success_call: Option<(String, Value)>,
    consecutive_successes: u32,
}

impl LoopDetectors {
    /// A fresh detector set for a new task.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed tool call and return the first heuristic that
    /// now fires, if any.
    ///
    /// An unknown-tool failure repeats the same (tool, args) pair by
    /// construction, so `consecutive_errors` and `consecutive_unknown_tool`
    /// climb together — and since `REPEATED_ERROR_THRESHOLD (2)` is
    /// lower than `UNKNOWN_TOOL_THRESHOLD (3)`, checking repeated-error
    /// unconditionally would always pre-empt unknown-tool on the second
    /// call, making the unknown-tool heuristic unreachable. Unknown-tool
    /// is the more specific condition, so an unknown-tool failure is
    /// judged only against its own threshold; the generic repeated-error
    /// threshold only applies to failures of tools that do exist.
    pub fn record_error(&mut self, tool: &str, args: &Value, message: &str, is_unknown: bool) -> Option<DetectorOutcome> {
        self.consecutive_successes = 0;
        self.last_success_call = None;

        self.total_errors += 1;

        let same_call = self
            .last_error_call
            .as_ref()
            .is_some_and(|(t, a)| t == tool && a == args);
        if same_call {
            self.consecutive_errors += 1;
        } else {
            self.consecutive_errors = 1;
            self.last_error_call = Some((tool.to_string(), args.clone()));
        }

        if is_unknown {
            self.consecutive_unknown_tool += 1;
        } else {
            self.consecutive_unknown_tool = 0;
        }

        if is_unknown {
            if self.consecutive_unknown_tool >= UNKNOWN_TOOL_THRESHOLD {
                return Some(DetectorOutcome::UnknownTool);
            }
        } else if self.consecutive_errors >= REPEATED_ERROR_THRESHOLD {
            return Some(DetectorOutcome::RepeatedError {
                tool: tool.to_string(),
                message: message.to_string(),
            });
        }

        if self.total_errors >= TOTAL_ERROR_THRESHOLD {
            return Some(DetectorOutcome::TotalError);
        }
        None
    }

    /// Record a successful tool call and return `RepeatedSuccess` once
    /// the same call has succeeded three times running.
    ///
    /// Resets on either a different tool name *or* different arguments
    /// — calling the same tool with new arguments is legitimate
    /// exploratory work, not the model spinning in place, so it must
    /// not count toward the threshold.
    pub fn record_success(&mut self, tool: &str, args: &Value, result: &str) -> Option<DetectorOutcome> {
        self.consecutive_errors = 0;
        self.last_error_call = None;
        self.consecutive_unknown_tool = 0;

        let same_call = self
            .last_success_call
            .as_ref()
            .is_some_and(|(t, a)| t == tool && a == args);
        if same_call {
            self.consecutive_successes += 1;
        } else {
            self.consecutive_successes = 1;
            self.last_success_call = Some((tool.to_string(), args.clone()));
        }

        if self.consecutive_successes >= REPEATED_SUCCESS_THRESHOLD {
            return Some(DetectorOutcome::RepeatedSuccess {
                tool: tool.to_string(),
                result: result.to_string(),
            });
        }
        None
    }
}

/// Per-tool answer-synthesis templates used by the repeated-success
/// breaker, keeping the last tool result rather than forcing another
/// generator round trip.
pub fn synthesize_answer(tool_name: &str, result: &str) -> String {
    match tool_name {
        "current_time" => format!("The current time is {result}."),
        "calculator" => format!("The result is {result}."),
        "read_file" => format!("Here is the file content:\n{result}"),
        "list_files" => format!("Here are the files:\n{result}"),
        "http_get" => format!("Here is the response:\n{result}"),
        _ => format!("Based on my analysis: {result}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn repeated_error_fires_on_second_identical_failure() {
        let mut detectors = LoopDetectors::new();
        let args = json!({"path": "/missing"});
        assert!(detectors.record_error("read_file", &args, "not found", false).is_none());
        let outcome = detectors.record_error("read_file", &args, "not found", false);
        assert_eq!(
            outcome,
            Some(DetectorOutcome::RepeatedError {
                tool: "read_file".into(),
                message: "not found".into()
            })
        );
    }

    #[test]
    fn different_arguments_do_not_count_as_repeated_error() {
        let mut detectors = LoopDetectors::new();
        assert!(detectors
            .record_error("read_file", &json!({"path": "/a"}), "not found", false)
            .is_none());
        assert!(detectors
            .record_error("read_file", &json!({"path": "/b"}), "not found", false)
            .is_none());
    }

    #[test]
    fn total_error_fires_at_five_unrelated_failures() {
        let mut detectors = LoopDetectors::new();
        for i in 0..4 {
            let outcome = detectors.record_error("shell", &json!({"command": format!("cmd{i}")}), "boom", false);
            assert!(outcome.is_none());
        }
        let outcome = detectors.record_error("shell", &json!({"command": "cmd4"}), "boom", false);
        assert_eq!(outcome, Some(DetectorOutcome::TotalError));
    }

    #[test]
    fn unknown_tool_fires_at_three_consecutive_unknown_calls() {
        let mut detectors = LoopDetectors::new();
        assert!(detectors
            .record_error("web_search", &json!({}), "unknown tool: web_search", true)
            .is_none());
        assert!(detectors
            .record_error("web_search", &json!({}), "unknown tool: web_search", true)
            .is_none());
        let outcome = detectors.record_error("web_search", &json!({}), "unknown tool: web_search", true);
        assert_eq!(outcome, Some(DetectorOutcome::UnknownTool));
    }

    #[test]
    fn repeated_success_fires_on_third_identical_call() {
        let mut detectors = LoopDetectors::new();
        let args = json!({"expression": "1+1"});
        assert!(detectors.record_success("calculator", &args, "2").is_none());
        assert!(detectors.record_success("calculator", &args, "2").is_none());
        let outcome = detectors.record_success("calculator", &args, "2");
        assert_eq!(
            outcome,
            Some(DetectorOutcome::RepeatedSuccess {
                tool: "calculator".into(),
                result: "2".into()
            })
        );
    }

    #[test]
    fn repeated_success_resets_on_argument_change() {
        let mut detectors = LoopDetectors::new();
        assert!(detectors
            .record_success("calculator", &json!({"expression": "1+1"}), "2")
            .is_none());
        assert!(detectors
            .record_success("calculator", &json!({"expression": "2+2"}), "4")
            .is_none());
        assert!(detectors
            .record_success("calculator", &json!({"expression": "2+2"}), "4")
            .is_none());
    }

    #[test]
    fn success_clears_error_streak() {
        let mut detectors = LoopDetectors::new();
        let args = json!({"path": "/missing"});
        assert!(detectors.record_error("read_file", &args, "not found", false).is_none());
        assert!(detectors
            .record_success("read_file", &json!({"path": "/ok"}), "hi")
            .is_none());
        assert!(detectors.record_error("read_file", &args, "not found", false).is_none());
    }

    #[test]
    fn synthesis_templates_match_per_tool() {
        assert_eq!(synthesize_answer("calculator", "4"), "The result is 4.");
        assert_eq!(synthesize_answer("current_time", "noon"), "The current time is noon.");
        assert_eq!(
            synthesize_answer("read_file", "hi"),
            "Here is the file content:\nhi"
        );
        assert_eq!(synthesize_answer("list_files", "a.txt"), "Here are the files:\na.txt");
        assert_eq!(synthesize_answer("http_get", "ok"), "Here is the response:\nok");
        assert_eq!(synthesize_answer("echo_tool", "x"), "Based on my analysis: x");
    }
}
