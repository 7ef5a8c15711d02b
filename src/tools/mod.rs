//! Tool router: registers and dispatches MCP tool calls.
//!
//! Agent-backed tools are prompt templates around one [`AgentRunner`] call;
//! `judge_quality` and `agent_status` run locally. The router owns the runner
//! and provides `list_tools()` / `call_tool()` for the MCP server.

pub mod audit;
pub mod docs;
pub mod git;
pub mod judge;
pub mod refactor;
pub mod review;
pub mod scaffold;
pub mod status;
pub mod testgen;
pub mod workflow;

use anyhow::Result;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::MeshError;
use crate::runner::{AgentRunner, ExecutionResult};
use crate::server::{ContentItem, ToolCallResult, ToolDefinition};

/// Build a text-only tool result.
pub fn text_result(text: impl Into<String>, is_error: bool) -> ToolCallResult {
    ToolCallResult {
        content: vec![ContentItem {
            content_type: "text".to_owned(),
            text: text.into(),
        }],
        is_error,
    }
}

/// Render an agent result for the client.
///
/// Failures keep whatever partial output the agent produced.
pub fn render_execution(title: &str, result: &ExecutionResult) -> ToolCallResult {
    if result.succeeded {
        let text = if result.text.trim().is_empty() {
            format!("{title}: completed with no output.")
        } else {
            result.text.clone()
        };
        return text_result(text, false);
    }

    let diagnostic = result.diagnostic.as_deref().unwrap_or("unknown error");
    let mut text = format!("{title} failed: {diagnostic}");
    if !result.text.trim().is_empty() {
        text.push_str("\n\nPartial output:\n");
        text.push_str(&result.text);
    }
    text_result(text, true)
}

/// Deserialize tool arguments, reporting failures against the tool name.
pub fn parse_params<T: DeserializeOwned>(tool: &str, arguments: serde_json::Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| {
        MeshError::InvalidParams {
            tool: tool.to_owned(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Add the shared execution options to a tool's input schema.
pub fn with_execution_options(mut schema: serde_json::Value) -> serde_json::Value {
    if let Some(props) = schema
        .get_mut("properties")
        .and_then(serde_json::Value::as_object_mut)
    {
        props.insert(
            "autoApprove".to_owned(),
            serde_json::json!({
                "type": "boolean",
                "description": "Let the agent act without confirmation (default: true)",
                "default": true
            }),
        );
        props.insert(
            "mode".to_owned(),
            serde_json::json!({
                "type": "string",
                "enum": ["act", "plan"],
                "description": "Agent mode; plan describes changes without making them"
            }),
        );
        props.insert(
            "workingDirectory".to_owned(),
            serde_json::json!({
                "type": "string",
                "description": "Directory the agent runs in (default: server workspace)"
            }),
        );
        props.insert(
            "timeoutMillis".to_owned(),
            serde_json::json!({
                "type": "integer",
                "description": "Timeout in milliseconds (default: 300000)",
                "minimum": 1
            }),
        );
    }
    schema
}

/// Tool router that dispatches MCP tool calls to implementations.
#[derive(Debug)]
pub struct ToolRouter {
    runner: AgentRunner,
}

impl ToolRouter {
    /// Create a new tool router.
    pub const fn new(runner: AgentRunner) -> Self {
        Self { runner }
    }

    pub const fn runner(&self) -> &AgentRunner {
        &self.runner
    }

    /// List all available tools with their JSON Schema definitions.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![
            review::tool_definition(),
            refactor::tool_definition(),
            testgen::tool_definition(),
            docs::tool_definition(),
            git::tool_definition(),
            scaffold::tool_definition(),
            audit::tool_definition(),
            workflow::tool_definition(),
            judge::tool_definition(),
            status::tool_definition(),
        ]
    }

    /// Call a tool by name with the given JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are malformed or fail pre-flight
    /// validation. Agent failures come back as an error result instead.
    pub fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolCallResult> {
        debug!(tool = name, "dispatching tool call");

        match name {
            review::NAME => review::execute(&self.runner, arguments),
            refactor::NAME => refactor::execute(&self.runner, arguments),
            testgen::NAME => testgen::execute(&self.runner, arguments),
            docs::NAME => docs::execute(&self.runner, arguments),
            git::NAME => git::execute(&self.runner, arguments),
            scaffold::NAME => scaffold::execute(&self.runner, arguments),
            audit::NAME => audit::execute(&self.runner, arguments),
            workflow::NAME => workflow::execute(&self.runner, arguments),
            judge::NAME => judge::execute(arguments),
            status::NAME => status::execute(&self.runner, arguments),
            _ => Ok(text_result(format!("Unknown tool: {name}"), true)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_rendering_surfaces_partial_output() {
        let result = ExecutionResult::failure("half a diff".to_owned(), "timed out".to_owned());
        let rendered = render_execution("Refactor", &result);
        assert!(rendered.is_error);
        let text = &rendered.content[0].text;
        assert!(text.starts_with("Refactor failed: timed out"));
        assert!(text.contains("Partial output:\nhalf a diff"));
    }

    #[test]
    fn empty_success_is_explained() {
        let rendered = render_execution("Docs", &ExecutionResult::success(String::new()));
        assert!(!rendered.is_error);
        assert_eq!(rendered.content[0].text, "Docs: completed with no output.");
    }

    #[test]
    fn shared_options_added_to_schema() {
        let schema = with_execution_options(serde_json::json!({
            "type": "object",
            "properties": { "target": { "type": "string" } },
            "required": ["target"]
        }));
        let props = schema["properties"].as_object().expect("properties");
        for key in ["target", "autoApprove", "mode", "workingDirectory", "timeoutMillis"] {
            assert!(props.contains_key(key), "missing {key}");
        }
    }
}
