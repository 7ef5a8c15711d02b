//! Security audit tool.

use anyhow::Result;
use serde::Deserialize;

use crate::runner::{AgentMode, AgentRunner, ExecutionOptions};
use crate::server::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "security_audit";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditParams {
    pub target: String,
    #[serde(flatten)]
    pub options: ExecutionOptions,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_owned(),
        description: "Audit code for security vulnerabilities such as injection, unsafe \
            deserialization, secrets in source and missing input validation. Plan mode by default."
            .to_owned(),
        input_schema: super::with_execution_options(serde_json::json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": "string",
                    "description": "File or directory to audit"
                }
            },
            "required": ["target"]
        })),
    }
}

pub fn build_prompt(params: &AuditParams) -> String {
    format!(
        "Perform a security audit of {}. Look for injection flaws, path traversal, unsafe \
         deserialization, hardcoded secrets, weak cryptography, missing input validation and \
         vulnerable dependencies. For each finding give severity, location, impact and remediation. \
         Do not modify any files.",
        params.target
    )
}

pub fn execute(runner: &AgentRunner, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: AuditParams = super::parse_params(NAME, arguments)?;
    let options = params.options.clone().with_default_mode(AgentMode::Plan);
    let result = runner.run(&build_prompt(&params), &options)?;
    Ok(super::render_execution("Security audit", &result))
}
