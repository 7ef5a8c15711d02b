//! Code review tool: plan-mode review of files or directories.

use anyhow::Result;
use serde::Deserialize;

use crate::runner::{AgentMode, AgentRunner, ExecutionOptions};
use crate::server::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "code_review";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewParams {
    /// File, directory or glob to review.
    pub target: String,
    /// Optional area to concentrate on (e.g. "error handling").
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(flatten)]
    pub options: ExecutionOptions,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_owned(),
        description: "Review code for bugs, readability and maintainability issues. \
            Runs the agent in plan mode unless a mode is given."
            .to_owned(),
        input_schema: super::with_execution_options(serde_json::json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": "string",
                    "description": "File or directory to review"
                },
                "focus": {
                    "type": "string",
                    "description": "Area to concentrate on"
                }
            },
            "required": ["target"]
        })),
    }
}

pub fn build_prompt(params: &ReviewParams) -> String {
    let mut prompt = format!(
        "Review the code in {}. Report bugs, risky patterns, readability problems and \
         missing tests, ordered by severity, with file and line references and a concrete fix for each.",
        params.target
    );
    if let Some(focus) = params.focus.as_deref().filter(|f| !f.trim().is_empty()) {
        prompt.push_str(&format!(" Pay particular attention to {focus}."));
    }
    prompt.push_str(" Do not modify any files.");
    prompt
}

pub fn execute(runner: &AgentRunner, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: ReviewParams = super::parse_params(NAME, arguments)?;
    let options = params.options.clone().with_default_mode(AgentMode::Plan);
    let result = runner.run(&build_prompt(&params), &options)?;
    Ok(super::render_execution("Code review", &result))
}
