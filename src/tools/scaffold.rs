//! Project scaffolding tool.

use anyhow::Result;
use serde::Deserialize;

use crate::runner::{AgentRunner, ExecutionOptions};
use crate::server::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "scaffold";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldParams {
    /// What the new project or component is.
    pub description: String,
    /// Language/framework stack.
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(flatten)]
    pub options: ExecutionOptions,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_owned(),
        description: "Create a new project or component skeleton with build files, a sample \
            module and a passing test."
            .to_owned(),
        input_schema: super::with_execution_options(serde_json::json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "What to scaffold"
                },
                "stack": {
                    "type": "string",
                    "description": "Language or framework (e.g. rust, nextjs, fastapi)"
                }
            },
            "required": ["description"]
        })),
    }
}

pub fn build_prompt(params: &ScaffoldParams) -> String {
    let stack = params
        .stack
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("a suitable mainstream stack");
    format!(
        "Scaffold {} using {stack}. Create the build configuration, directory layout, a minimal \
         working entry point, one passing test and a short README, then list the files created.",
        params.description
    )
}

pub fn execute(runner: &AgentRunner, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: ScaffoldParams = super::parse_params(NAME, arguments)?;
    let result = runner.run(&build_prompt(&params), &params.options)?;
    Ok(super::render_execution("Scaffold", &result))
}
