//! Documentation tool.

use anyhow::Result;
use serde::Deserialize;

use crate::runner::{AgentRunner, ExecutionOptions};
use crate::server::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "generate_docs";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsParams {
    pub target: String,
    /// Documentation style, e.g. "rustdoc", "jsdoc", "readme".
    #[serde(default)]
    pub style: Option<String>,
    #[serde(flatten)]
    pub options: ExecutionOptions,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_owned(),
        description: "Add or update documentation for the given code.".to_owned(),
        input_schema: super::with_execution_options(serde_json::json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": "string",
                    "description": "File, module or project to document"
                },
                "style": {
                    "type": "string",
                    "description": "Documentation style (e.g. rustdoc, jsdoc, readme)"
                }
            },
            "required": ["target"]
        })),
    }
}

pub fn build_prompt(params: &DocsParams) -> String {
    let mut prompt = format!(
        "Document {}. Describe purpose, parameters, return values, errors and usage examples \
         for public items, and keep the wording consistent with existing docs.",
        params.target
    );
    if let Some(style) = params.style.as_deref().filter(|s| !s.trim().is_empty()) {
        prompt.push_str(&format!(" Use the {style} style."));
    }
    prompt
}

pub fn execute(runner: &AgentRunner, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: DocsParams = super::parse_params(NAME, arguments)?;
    let result = runner.run(&build_prompt(&params), &params.options)?;
    Ok(super::render_execution("Documentation", &result))
}
