//! User-declared tools: shell/http/script templates loaded from the
//! tool-configuration file (§4.3).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use corvid_types::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ToolContext;
use crate::ToolDyn;

/// How a user-declared tool is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserToolType {
    /// Runs `command` (after substitution) through a shell.
    Shell,
    /// Issues an HTTP GET against `url` (after substitution).
    Http,
    /// Runs `script` (after substitution) through a shell.
    Script,
}

/// One entry from the tool-configuration file's `tools` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserToolConfig {
    /// Tool name, registered as-is.
    pub name: String,
    /// Description surfaced to the model.
    pub description: String,
    /// Parameter schema, passed through verbatim.
    #[serde(default)]
    pub parameters: Value,
    /// Which invocation style this tool uses.
    #[serde(rename = "type")]
    pub tool_type: UserToolType,
    /// Command template for `shell`. `${var}` placeholders.
    #[serde(default)]
    pub command: Option<String>,
    /// URL template for `http`. `{var}` placeholders.
    #[serde(default)]
    pub url: Option<String>,
    /// Script-path template for `script`. `${var}` placeholders.
    #[serde(default)]
    pub script: Option<String>,
}

/// Substitute `${var}` placeholders (shell/script style). Placeholders
/// whose key is absent from `args` are left verbatim.
fn substitute_dollar_brace(template: &str, args: &serde_json::Map<String, Value>) -> String {
    substitute(template, args, "${", "}")
}

/// Substitute `{var}` placeholders (http style). Placeholders whose key
/// is absent from `args` are left verbatim.
fn substitute_brace(template: &str, args: &serde_json::Map<String, Value>) -> String {
    substitute(template, args, "{", "}")
}

fn substitute(template: &str, args: &serde_json::Map<String, Value>, open: &str, close: &str) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let Some(start) = rest.find(open) else {
            result.push_str(rest);
            break;
        };
        let before = &rest[..start];
        result.push_str(before);
        let after_open = &rest[start + open.len()..];
        let Some(end) = after_open.find(close) else {
            result.push_str(&rest[start..]);
            break;
        };
        let key = &after_open[..end];
        match args.get(key).and_then(value_as_plain_string) {
            Some(value) => result.push_str(&value),
            None => {
                // Unresolved placeholder: left verbatim in the output.
                result.push_str(open);
                result.push_str(key);
                result.push_str(close);
            }
        }
        rest = &after_open[end + close.len()..];
    }
    result
}

fn value_as_plain_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn args_as_map(args: &Value) -> serde_json::Map<String, Value> {
    args.as_object().cloned().unwrap_or_default()
}

/// A single user-declared tool, ready to register into a
/// [`crate::ToolRegistry`].
pub struct UserTool {
    config: UserToolConfig,
    client: reqwest::Client,
}

impl UserTool {
    /// Wrap a config entry as a callable tool.
    pub fn new(config: UserToolConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

impl ToolDyn for UserTool {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    fn parameter_schema(&self) -> serde_json::Value {
        self.config.parameters.clone()
    }

    fn call(
        &self,
        ctx: ToolContext,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, ToolError>> + Send + '_>> {
        let args = args_as_map(&input);
        let config = self.config.clone_for_call();
        let client = self.client.clone();

        Box::pin(async move {
            match config.tool_type {
                UserToolType::Shell => {
                    let template = config.command.as_deref().unwrap_or_default();
                    let command = substitute_dollar_brace(template, &args);
                    run_shell(&command, &ctx).await
                }
                UserToolType::Script => {
                    let template = config.script.as_deref().unwrap_or_default();
                    let command = substitute_dollar_brace(template, &args);
                    run_shell(&command, &ctx).await
                }
                UserToolType::Http => {
                    let template = config.url.as_deref().unwrap_or_default();
                    let url = substitute_brace(template, &args);
                    let request = client.get(&url).timeout(Duration::from_secs(30)).send();
                    let response = tokio::select! {
                        result = request => result.map_err(|e| ToolError::ExecutionFailed(format!("GET {url}: {e}")))?,
                        _ = ctx.cancelled() => return Err(ToolError::Timeout(format!("{} cancelled", config.name))),
                    };
                    let status = response.status().as_u16();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| ToolError::ExecutionFailed(format!("reading body: {e}")))?;
                    Ok(format!("Status: {status}\nBody:\n{body}"))
                }
            }
        })
    }
}

async fn run_shell(command: &str, ctx: &ToolContext) -> Result<String, ToolError> {
    let child = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| ToolError::ExecutionFailed(format!("spawning: {e}")))?;

    let output = tokio::select! {
        result = child.wait_with_output() => result.map_err(|e| ToolError::ExecutionFailed(format!("waiting: {e}")))?,
        _ = ctx.cancelled() => return Err(ToolError::Timeout("user tool cancelled".to_string())),
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(combined)
}

impl UserToolConfig {
    fn clone_for_call(&self) -> UserToolConfig {
        self.clone()
    }
}
