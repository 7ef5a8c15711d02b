//! Git assistant tool.

use anyhow::Result;
use serde::Deserialize;

use crate::runner::{AgentRunner, ExecutionOptions};
use crate::server::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "git_assist";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitParams {
    /// What to do, e.g. "write a commit message for the staged changes".
    pub task: String,
    #[serde(flatten)]
    pub options: ExecutionOptions,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_owned(),
        description: "Perform a git task in the working directory: commit messages, branch \
            cleanup, conflict resolution, history summaries."
            .to_owned(),
        input_schema: super::with_execution_options(serde_json::json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "Git task to perform"
                }
            },
            "required": ["task"]
        })),
    }
}

pub fn build_prompt(params: &GitParams) -> String {
    format!(
        "Using git in the current repository, {}. Never force push or rewrite published history, \
         and report the exact git commands you ran.",
        params.task
    )
}

pub fn execute(runner: &AgentRunner, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: GitParams = super::parse_params(NAME, arguments)?;
    let result = runner.run(&build_prompt(&params), &params.options)?;
    Ok(super::render_execution("Git task", &result))
}
