//! Built-in tool implementations (C2).
//!
//! Seven small state machines over their inputs. All truncate outputs
//! before returning and all derive their error kinds from
//! [`corvid_types::ToolError`].

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use corvid_types::{ToolDescriptor, ToolError};
use serde_json::json;

use crate::context::ToolContext;
use crate::registry::{ToolRegistry, ToolSource};
use crate::ToolDyn;

const SHELL_DENY_LIST: &[&str] = &["rm -rf /", "mkfs", "dd if=", "> /dev/"];

/// Register all seven built-ins into `registry` as [`ToolSource::Builtin`].
pub async fn register_builtins(registry: &ToolRegistry) {
    registry
        .register(
            ToolDescriptor::new(
                "calculator",
                "Evaluate an arithmetic expression and return the numeric result.",
                json!({
                    "type": "object",
                    "properties": {"expression": {"type": "string"}},
                    "required": ["expression"],
                }),
            ),
            Arc::new(Calculator),
            ToolSource::Builtin,
        )
        .await;
    registry
        .register(
            ToolDescriptor::new(
                "read_file",
                "Read the entire contents of a file as text.",
                json!({
                    "type": "object",
                    "properties": {"path": {"type": "string"}},
                    "required": ["path"],
                }),
            ),
            Arc::new(ReadFile),
            ToolSource::Builtin,
        )
        .await;
    registry
        .register(
            ToolDescriptor::new(
                "write_file",
                "Write (overwriting) text content to a file, creating parent directories.",
                json!({
                    "type": "object",
                    "properties": {"path": {"type": "string"}, "content": {"type": "string"}},
                    "required": ["path", "content"],
                }),
            ),
            Arc::new(WriteFile),
            ToolSource::Builtin,
        )
        .await;
    registry
        .register(
            ToolDescriptor::new(
                "list_files",
                "List directory entries, one per line.",
                json!({
                    "type": "object",
                    "properties": {"path": {"type": "string"}},
                    "required": ["path"],
                }),
            ),
            Arc::new(ListFiles),
            ToolSource::Builtin,
        )
        .await;
    registry
        .register(
            ToolDescriptor::new(
                "shell",
                "Execute a shell command and return combined stdout/stderr.",
                json!({
                    "type": "object",
                    "properties": {"command": {"type": "string"}},
                    "required": ["command"],
                }),
            ),
            Arc::new(Shell),
            ToolSource::Builtin,
        )
        .await;
    registry
        .register(
            ToolDescriptor::new(
                "http_get",
                "Issue an HTTP GET request and return the status and body.",
                json!({
                    "type": "object",
                    "properties": {"url": {"type": "string"}},
                    "required": ["url"],
                }),
            ),
            Arc::new(HttpGet::default()),
            ToolSource::Builtin,
        )
        .await;
    registry
        .register(
            ToolDescriptor::new(
                "current_time",
                "Return the current local time.",
                json!({"type": "object", "properties": {}}),
            ),
            Arc::new(CurrentTime),
            ToolSource::Builtin,
        )
        .await;
}

/// The names of the seven built-ins, for loop diagnostics (unknown-tool
/// breaker, system-prompt synthesis).
pub const BUILTIN_NAMES: &[&str] = &[
    "calculator",
    "read_file",
    "write_file",
    "list_files",
    "shell",
    "http_get",
    "current_time",
];

fn string_arg(input: &serde_json::Value, key: &str) -> Result<String, ToolError> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidInput(format!("missing required field `{key}`")))
}

fn truncate_chars(s: &str, limit: usize, suffix: &str) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(limit).collect();
    truncated.push_str(suffix);
    truncated
}

/// `{expression: string} -> numeric result as text`.
///
/// Tries `meval` first (a sandboxed numeric-expression evaluator); on
/// failure falls back to `rhai`'s expression evaluator. If both fail,
/// the call fails with `tool-unavailable`.
struct Calculator;

impl ToolDyn for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }
    fn description(&self) -> &str {
        "Evaluate an arithmetic expression."
    }
    fn parameter_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {"expression": {"type": "string"}}, "required": ["expression"]})
    }
    fn call(
        &self,
        _ctx: ToolContext,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let expression = string_arg(&input, "expression")?;

            if let Ok(value) = meval::eval_str(&expression) {
                return Ok(format_number(value));
            }

            let engine = rhai::Engine::new();
            match engine.eval_expression::<f64>(&expression) {
                Ok(value) => Ok(format_number(value)),
                Err(_) => match engine.eval_expression::<i64>(&expression) {
                    Ok(value) => Ok(value.to_string()),
                    Err(e) => Err(ToolError::Unavailable(format!(
                        "no evaluator could parse `{expression}`: {e}"
                    ))),
                },
            }
        })
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{value}");
        s
    }
}

/// `{path: string} -> file contents, truncated at 3,000 characters`.
struct ReadFile;

impl ToolDyn for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }
    fn description(&self) -> &str {
        "Read the entire contents of a file."
    }
    fn parameter_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {"path": {"type": "string"}}, "required": ["path"]})
    }
    fn call(
        &self,
        _ctx: ToolContext,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let path = string_arg(&input, "path")?;
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ToolError::ExecutionFailed(format!("reading {path}: {e}")))?;
            Ok(truncate_chars(&content, 3_000, "\n(file truncated)"))
        })
    }
}

/// `{path, content} -> acknowledgment including byte count`.
struct WriteFile;

impl ToolDyn for WriteFile {
    fn name(&self) -> &str {
        "write_file"
    }
    fn description(&self) -> &str {
        "Overwrite a file with the given content, creating parent directories."
    }
    fn parameter_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {"path": {"type": "string"}, "content": {"type": "string"}},
            "required": ["path", "content"],
        })
    }
    fn call(
        &self,
        _ctx: ToolContext,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let path = string_arg(&input, "path")?;
            let content = string_arg(&input, "content")?;
            if let Some(parent) = Path::new(&path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| ToolError::ExecutionFailed(format!("creating dirs: {e}")))?;
                }
            }
            tokio::fs::write(&path, &content)
                .await
                .map_err(|e| ToolError::ExecutionFailed(format!("writing {path}: {e}")))?;
            Ok(format!("Wrote {} bytes to {path}", content.len()))
        })
    }
}

/// `{path} -> one line per entry, tagged directory vs file`.
struct ListFiles;

impl ToolDyn for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }
    fn description(&self) -> &str {
        "List the entries of a directory."
    }
    fn parameter_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {"path": {"type": "string"}}, "required": ["path"]})
    }
    fn call(
        &self,
        _ctx: ToolContext,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let path = string_arg(&input, "path")?;
            let mut dir = tokio::fs::read_dir(&path)
                .await
                .map_err(|e| ToolError::ExecutionFailed(format!("listing {path}: {e}")))?;
            let mut lines = Vec::new();
            loop {
                let entry = dir
                    .next_entry()
                    .await
                    .map_err(|e| ToolError::ExecutionFailed(format!("reading entry: {e}")))?;
                let Some(entry) = entry else { break };
                let name = entry.file_name().to_string_lossy().into_owned();
                let metadata = entry
                    .metadata()
                    .await
                    .map_err(|e| ToolError::ExecutionFailed(format!("stat {name}: {e}")))?;
                if metadata.is_dir() {
                    lines.push(format!("[DIR]  {name}"));
                } else {
                    lines.push(format!("[FILE] {name} ({} bytes)", metadata.len()));
                }
            }
            Ok(lines.join("\n"))
        })
    }
}

/// `{command: string} -> combined stdout+stderr, truncated at 2,000 characters`.
///
/// Blocks commands containing any deny-listed substring, even within a
/// longer command. Cancellable: honors `ctx` while the subprocess runs.
struct Shell;

impl ToolDyn for Shell {
    fn name(&self) -> &str {
        "shell"
    }
    fn description(&self) -> &str {
        "Execute a shell command."
    }
    fn parameter_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {"command": {"type": "string"}}, "required": ["command"]})
    }
    fn call(
        &self,
        ctx: ToolContext,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let command = string_arg(&input, "command")?;
            if let Some(hit) = SHELL_DENY_LIST.iter().find(|s| command.contains(*s)) {
                return Err(ToolError::InvalidInput(format!(
                    "command blocked by deny-list: contains `{hit}`"
                )));
            }

            let mut child = tokio::process::Command::new("sh")
                .arg("-c")
                .arg(&command)
                .stdout(std::process::Stdio::piped())
                .stderr(std::process::Stdio::piped())
                .spawn()
                .map_err(|e| ToolError::ExecutionFailed(format!("spawning shell: {e}")))?;

            let output = tokio::select! {
                result = child.wait_with_output() => {
                    result.map_err(|e| ToolError::ExecutionFailed(format!("waiting on shell: {e}")))?
                }
                _ = ctx.cancelled() => {
                    return Err(ToolError::Timeout("shell command cancelled".to_string()));
                }
            };

            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            Ok(truncate_chars(&combined, 2_000, "\n... (output truncated)"))
        })
    }
}

/// `{url} -> "Status: N\nBody:\n..."`, 30-second ceiling, body capped at
/// 10,000 bytes. Cancellable.
struct HttpGet {
    client: reqwest::Client,
}

impl Default for HttpGet {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl ToolDyn for HttpGet {
    fn name(&self) -> &str {
        "http_get"
    }
    fn description(&self) -> &str {
        "Issue an HTTP GET request."
    }
    fn parameter_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {"url": {"type": "string"}}, "required": ["url"]})
    }
    fn call(
        &self,
        ctx: ToolContext,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        let client = self.client.clone();
        Box::pin(async move {
            let url = string_arg(&input, "url")?;
            let request = client.get(&url).timeout(Duration::from_secs(30)).send();

            let response = tokio::select! {
                result = request => {
                    result.map_err(|e| ToolError::ExecutionFailed(format!("GET {url}: {e}")))?
                }
                _ = ctx.cancelled() => {
                    return Err(ToolError::Timeout("http_get cancelled".to_string()));
                }
            };

            let status = response.status().as_u16();
            let body_fut = response.bytes();
            let body = tokio::select! {
                result = body_fut => {
                    result.map_err(|e| ToolError::ExecutionFailed(format!("reading body: {e}")))?
                }
                _ = ctx.cancelled() => {
                    return Err(ToolError::Timeout("http_get cancelled".to_string()));
                }
            };

            let capped = if body.len() > 10_000 { &body[..10_000] } else { &body[..] };
            let body_text = String::from_utf8_lossy(capped);
            Ok(format!("Status: {status}\nBody:\n{body_text}"))
        })
    }
}

/// `{} -> local-time formatted string`.
struct CurrentTime;

impl ToolDyn for CurrentTime {
    fn name(&self) -> &str {
        "current_time"
    }
    fn description(&self) -> &str {
        "Return the current local time."
    }
    fn parameter_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {}})
    }
    fn call(
        &self,
        _ctx: ToolContext,
        _input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        Box::pin(async move {
            Ok(chrono::Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string())
        })
    }
}
