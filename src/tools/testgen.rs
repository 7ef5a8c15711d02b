//! Test generation tool.

use anyhow::Result;
use serde::Deserialize;

use crate::runner::{AgentRunner, ExecutionOptions};
use crate::server::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "generate_tests";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestGenParams {
    pub target: String,
    /// Test framework to use; detected from the project when absent.
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(flatten)]
    pub options: ExecutionOptions,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_owned(),
        description: "Write unit tests for the given code, covering normal paths, edge cases \
            and error handling."
            .to_owned(),
        input_schema: super::with_execution_options(serde_json::json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": "string",
                    "description": "File or module to test"
                },
                "framework": {
                    "type": "string",
                    "description": "Test framework (default: detect from project)"
                }
            },
            "required": ["target"]
        })),
    }
}

pub fn build_prompt(params: &TestGenParams) -> String {
    let framework = params
        .framework
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .map_or_else(
            || "the test framework the project already uses".to_owned(),
            |f| format!("the {f} framework"),
        );
    format!(
        "Write unit tests for {} using {framework}. Cover the main behavior, edge cases and \
         error paths, follow the existing test layout and naming, run the new tests and fix any that fail.",
        params.target
    )
}

pub fn execute(runner: &AgentRunner, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: TestGenParams = super::parse_params(NAME, arguments)?;
    let result = runner.run(&build_prompt(&params), &params.options)?;
    Ok(super::render_execution("Test generation", &result))
}
