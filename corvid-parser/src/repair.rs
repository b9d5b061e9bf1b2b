//! Best-effort repair of a tool's raw `Action_Input` text into something
//! `serde_json::from_str` can parse (§4.5's repair pipeline).
//!
//! Models rarely emit clean JSON for tool arguments. Rather than reject
//! anything short of valid JSON, this runs a fixed pipeline of
//! increasingly desperate strategies and returns the first candidate
//! that parses, falling back to a best-guess synthesized object.

/// Extract the first balanced `{ ... }` JSON object span from free text,
/// string/escape aware. Shared by argument repair and by the hierarchy
/// orchestration mode's work-plan parsing, both of which need to pull a
/// JSON object out of a model response that may carry surrounding prose.
pub fn extract_json_object(input: &str) -> Option<String> {
    extract_braced(input)
}

const COMMENTARY_PREFIXES: &[&str] = &["response:", "note:", "output:", "answer:", "this ", "since "];
const SECTION_MARKERS: &[&str] = &["\nthought:", "\naction:", "\nobservation:"];

/// Repair raw action-input text for `tool_name` into a string that
/// parses as JSON.
///
/// Returns the first well-formed JSON value produced by any repair
/// step; if nothing recoverable is found, synthesizes a single-key
/// object (`{}` or a bare string) so the tool still receives *some*
/// parseable input rather than the call failing outright.
pub fn repair_arguments(tool_name: &str, raw_input: &str) -> String {
    let stripped = strip_commentary(raw_input);

    if is_valid_json(&stripped) {
        return stripped;
    }

    if let Some(braced) = extract_braced(&stripped) {
        if is_valid_json(&braced) {
            return braced;
        }
        let validated = validate_and_fix(&braced);
        if is_valid_json(&validated) {
            return validated;
        }
    }

    if let Some(backtick) = extract_backtick_span(&stripped) {
        if is_valid_json(&backtick) {
            return backtick;
        }
        return synthesize_single_key(tool_name, &backtick);
    }

    if let Some(quoted) = strip_outer_quotes(&stripped) {
        if !quoted.trim().is_empty() {
            return synthesize_single_key(tool_name, &quoted);
        }
    }

    let residue = stripped.trim();
    if residue.is_empty() {
        // Always a JSON object, never the quoted-empty-string literal —
        // the repair output must be empty string, `{}`, or a JSON object.
        return "{}".to_string();
    }

    if let Some(pairs) = extract_key_value_pairs(residue) {
        return pairs;
    }

    synthesize_single_key(tool_name, residue)
}

/// Step 1: strip leading commentary markers, and truncate at an
/// embedded section-header marker that indicates trailing commentary
/// leaking in from the next turn.
///
/// This resolves an ambiguity in how "truncate at the first occurrence"
/// should be read: prefix markers (`Response:`, `Note:`, ...) precede
/// real content and are stripped from the front, while markers embedded
/// later in the text (`\nThought:`, `\nAction:`) mark the start of
/// trailing noise and truncate everything from that point on.
fn strip_commentary(input: &str) -> String {
    let mut text = input.trim().to_string();

    loop {
        let lower = text.to_ascii_lowercase();
        let mut stripped_any = false;
        for prefix in COMMENTARY_PREFIXES {
            if lower.starts_with(prefix) {
                text = text[prefix.len()..].trim_start().to_string();
                stripped_any = true;
                break;
            }
        }
        if !stripped_any {
            break;
        }
    }

    let lower = text.to_ascii_lowercase();
    let mut cut_at = text.len();
    for marker in SECTION_MARKERS {
        if let Some(pos) = lower.find(marker) {
            cut_at = cut_at.min(pos);
        }
    }
    text.truncate(cut_at);
    text.trim().to_string()
}

fn is_valid_json(candidate: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(candidate).is_ok()
}

/// Step 2: extract the first balanced `{ ... }` span, string/escape
/// aware so braces inside string literals don't throw off the count.
///
/// Exposed as [`crate::extract_json_object`] so other components (the
/// hierarchy orchestration mode's work-plan parsing) can reuse the same
/// extraction instead of duplicating it.
pub(crate) fn extract_braced(input: &str) -> Option<String> {
    let chars: Vec<char> = input.chars().collect();
    let start = chars.iter().position(|&c| c == '{')?;

    let mut depth = 0i64;
    let mut in_string = false;
    let mut escape = false;
    let mut end = None;

    for (i, &c) in chars.iter().enumerate().skip(start) {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let end = end?;
    Some(chars[start..=end].iter().collect())
}

/// Step 3: extract the first backtick-delimited span (models sometimes
/// wrap arguments in a code fence or inline-code span instead of JSON).
fn extract_backtick_span(input: &str) -> Option<String> {
    let first = input.find('`')?;
    let rest = &input[first + 1..];
    let second = rest.find('`')?;
    let span = rest[..second].trim();
    if span.is_empty() {
        None
    } else {
        Some(span.to_string())
    }
}

/// Step: strip a single layer of matching outer quotes, treating the
/// remainder as a plain string value rather than JSON.
fn strip_outer_quotes(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.len() >= 2 {
        let bytes = trimmed.as_bytes();
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return Some(trimmed[1..trimmed.len() - 1].to_string());
        }
    }
    None
}

/// The conventional single-argument key per built-in tool, used to
/// synthesize `{"<key>": "<value>"}` from plain-text residue.
///
/// `write_file` gets no key of its own: a single string value can't
/// supply both `path` and `content`, so it falls back to `{}` instead
/// (handled in [`synthesize_single_key`]). Every other tool name,
/// built-in or not (remote/user-declared tools included), falls back
/// to `input`.
fn default_key_for(tool_name: &str) -> Option<&'static str> {
    match tool_name {
        "calculator" => Some("expression"),
        "read_file" => Some("path"),
        "write_file" => None,
        "list_files" => Some("path"),
        "shell" => Some("command"),
        "http_get" => Some("url"),
        _ => Some("input"),
    }
}

/// Step 4/final synthesis: wrap plain-text residue into a single-key
/// object named after the tool's conventional argument, or `{}` for
/// `write_file`'s ambiguous case.
fn synthesize_single_key(tool_name: &str, value: &str) -> String {
    let value = value.trim();
    match default_key_for(tool_name) {
        Some(key) => serde_json::json!({ key: value }).to_string(),
        None => "{}".to_string(),
    }
}

/// Step 5: a cascade of increasingly aggressive textual fixes applied
/// to a string that looked JSON-ish (contains braces) but failed to
/// parse as-is.
fn validate_and_fix(candidate: &str) -> String {
    let mut text = candidate.to_string();

    if let Some(last_brace) = text.rfind('}') {
        text.truncate(last_brace + 1);
    }

    text = single_to_double_quotes(&text);

    while text.ends_with("}}") {
        text.pop();
    }

    text = quote_barewords(&text);

    if !is_valid_json(&text) {
        if let Some(pairs) = extract_key_value_pairs(candidate) {
            return un_double_escape(&pairs);
        }
    }

    un_double_escape(&text)
}

/// Replace single-quoted string delimiters with double quotes, leaving
/// content inside already-double-quoted strings untouched.
fn single_to_double_quotes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_double = false;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if !in_double => {
                in_double = true;
                out.push(c);
            }
            '"' if in_double => {
                in_double = false;
                out.push(c);
            }
            '\'' if !in_double => out.push('"'),
            _ => out.push(c),
        }
    }
    out
}

/// Quote unquoted object keys (`{key: "v"}` -> `{"key": "v"}`).
fn quote_barewords(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            in_string = !in_string;
            out.push(c);
            i += 1;
            continue;
        }
        if in_string {
            out.push(c);
            i += 1;
            continue;
        }
        let preceding_is_boundary = matches!(chars.get(i.wrapping_sub(1)), Some('{') | Some(',') | None) || i == 0;
        if preceding_is_boundary && (c.is_alphabetic() || c == '_') {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if chars.get(j) == Some(&':') {
                out.push('"');
                out.push_str(&word);
                out.push('"');
            } else {
                out.push_str(&word);
            }
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Last resort: hand-scan for `key: "value"` / `key: value` pairs and
/// assemble them into an object, with no brace requirement at all.
fn extract_key_value_pairs(input: &str) -> Option<String> {
    let mut pairs = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && !(bytes[i].is_ascii_alphabetic() || bytes[i] == b'_') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let key_start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
            i += 1;
        }
        let key = &input[key_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b':' {
            continue;
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
            let quote = bytes[i];
            i += 1;
            let value_start = i;
            while i < bytes.len() && bytes[i] != quote {
                i += 1;
            }
            let value = &input[value_start..i];
            pairs.push((key.to_string(), value.to_string()));
            i += 1;
        } else {
            let value_start = i;
            while i < bytes.len() && bytes[i] != b',' && bytes[i] != b'}' && bytes[i] != b'\n' {
                i += 1;
            }
            let value = input[value_start..i].trim().to_string();
            if !value.is_empty() {
                pairs.push((key.to_string(), value));
            }
        }
    }

    if pairs.is_empty() {
        return None;
    }

    let object: serde_json::Map<String, serde_json::Value> = pairs
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect();
    Some(serde_json::Value::Object(object).to_string())
}

/// A repair candidate sometimes double-escapes quotes that were already
/// correctly escaped by the earlier single-to-double pass; collapse
/// `\\"` runs that resulted from this back down to `\"`.
fn un_double_escape(input: &str) -> String {
    input.replace("\\\\\"", "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(s: &str) -> serde_json::Value {
        serde_json::from_str(s).unwrap_or_else(|e| panic!("expected valid json, got {s:?}: {e}"))
    }

    #[test]
    fn passes_through_well_formed_json() {
        let out = repair_arguments("calculator", r#"{"expression": "1 + 1"}"#);
        assert_eq!(parsed(&out), json!({"expression": "1 + 1"}));
    }

    #[test]
    fn strips_leading_commentary_prefix() {
        let out = repair_arguments("calculator", r#"Response: {"expression": "2*2"}"#);
        assert_eq!(parsed(&out), json!({"expression": "2*2"}));
    }

    #[test]
    fn truncates_at_embedded_section_marker() {
        let out = repair_arguments("calculator", "{\"expression\": \"2*2\"}\nThought: next step");
        assert_eq!(parsed(&out), json!({"expression": "2*2"}));
    }

    #[test]
    fn extracts_braced_span_among_surrounding_prose() {
        let out = repair_arguments("calculator", "sure, here you go {\"expression\": \"3+3\"} thanks");
        assert_eq!(parsed(&out), json!({"expression": "3+3"}));
    }

    #[test]
    fn fixes_single_quoted_json() {
        let out = repair_arguments("calculator", "{'expression': '4+4'}");
        assert_eq!(parsed(&out), json!({"expression": "4+4"}));
    }

    #[test]
    fn quotes_bareword_keys() {
        let out = repair_arguments("calculator", "{expression: \"5+5\"}");
        assert_eq!(parsed(&out), json!({"expression": "5+5"}));
    }

    #[test]
    fn extracts_backtick_span_for_single_key_tool() {
        let out = repair_arguments("shell", "run `ls -la`");
        assert_eq!(parsed(&out), json!({"command": "ls -la"}));
    }

    #[test]
    fn synthesizes_from_bare_plain_text_by_tool_convention() {
        let out = repair_arguments("read_file", "/tmp/notes.txt");
        assert_eq!(parsed(&out), json!({"path": "/tmp/notes.txt"}));
    }

    #[test]
    fn empty_residue_falls_back_to_empty_object_for_known_tool() {
        let out = repair_arguments("calculator", "   ");
        assert_eq!(parsed(&out), json!({}));
    }

    #[test]
    fn empty_residue_falls_back_to_empty_object_for_unknown_tool() {
        let out = repair_arguments("some_remote_tool", "");
        assert_eq!(parsed(&out), json!({}));
    }

    #[test]
    fn plain_text_residue_for_unknown_tool_lands_under_input_key() {
        let out = repair_arguments("some_remote_tool", "hello world");
        assert_eq!(parsed(&out), json!({"input": "hello world"}));
    }

    #[test]
    fn write_file_residue_falls_back_to_empty_object() {
        let out = repair_arguments("write_file", "notes.txt");
        assert_eq!(parsed(&out), json!({}));
    }

    #[test]
    fn last_resort_key_value_extraction_with_no_braces() {
        let out = repair_arguments("unknown_tool", "command: \"ls -la\", timeout: 30");
        let value = parsed(&out);
        assert_eq!(value["command"], json!("ls -la"));
        assert_eq!(value["timeout"], json!("30"));
    }

    #[test]
    fn extract_json_object_pulls_object_from_surrounding_prose() {
        let out = extract_json_object("here is the plan {\"subtasks\": [{\"agent\": \"worker\", \"task\": \"say hi\"}]} thanks").unwrap();
        assert_eq!(
            parsed(&out),
            json!({"subtasks": [{"agent": "worker", "task": "say hi"}]})
        );
    }

    #[test]
    fn trims_trailing_double_closing_brace() {
        let out = repair_arguments("calculator", "{\"expression\": \"6+6\"}}");
        assert_eq!(parsed(&out), json!({"expression": "6+6"}));
    }
}
