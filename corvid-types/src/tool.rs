//! Tool metadata shared between the registry, the system-prompt
//! builder, and remote-tool discovery.

use serde::{Deserialize, Serialize};

/// Immutable metadata describing a callable tool.
///
/// `parameters` is an untyped structured value (object-of-objects)
/// describing expected fields, their types, and required keys. It is
/// passed verbatim into the system prompt and into remote tool-call
/// envelopes — the core never interprets it as a real JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique, stable tool name.
    pub name: String,
    /// Human-readable description surfaced to the model.
    pub description: String,
    /// Parameter schema, passed through verbatim.
    pub parameters: serde_json::Value,
}

impl ToolDescriptor {
    /// Build a descriptor.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Required field names, read from `parameters.required` if present.
    pub fn required_fields(&self) -> Vec<String> {
        self.parameters
            .get("required")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
