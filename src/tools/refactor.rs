//! Refactor tool.

use anyhow::Result;
use serde::Deserialize;

use crate::runner::{AgentMode, AgentRunner, ExecutionOptions};
use crate::server::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "refactor";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactorParams {
    /// Code to refactor.
    pub target: String,
    /// What the refactor should achieve.
    pub goal: String,
    #[serde(flatten)]
    pub options: ExecutionOptions,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_owned(),
        description: "Refactor code toward a stated goal while preserving behavior. \
            The agent edits files in the working directory."
            .to_owned(),
        input_schema: super::with_execution_options(serde_json::json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": "string",
                    "description": "File or directory to refactor"
                },
                "goal": {
                    "type": "string",
                    "description": "Desired outcome, e.g. extract the parser into its own module"
                }
            },
            "required": ["target", "goal"]
        })),
    }
}

pub fn build_prompt(params: &RefactorParams) -> String {
    format!(
        "Refactor {} with this goal, {}. Preserve existing behavior and public interfaces, \
         keep the change minimal, run the existing tests if available, and summarize every file you changed.",
        params.target, params.goal
    )
}

pub fn execute(runner: &AgentRunner, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: RefactorParams = super::parse_params(NAME, arguments)?;
    let options = params.options.clone().with_default_mode(AgentMode::Act);
    let result = runner.run(&build_prompt(&params), &options)?;
    Ok(super::render_execution("Refactor", &result))
}
