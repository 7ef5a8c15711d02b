//! Agent status tool: reports how the agent executable resolves.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::runner::AgentRunner;
use crate::runner::resolver::{BARE_COMMAND, ExecutableSource};
use crate::server::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "agent_status";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    /// False when only the bare command is left and it is not on `PATH`.
    pub installed: bool,
    pub executable: String,
    pub source: String,
    /// Where the bare command resolves on `PATH`, if anywhere.
    pub on_path: Option<String>,
    pub runtime_version: String,
    pub default_timeout_ms: u128,
    pub working_directory: String,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_owned(),
        description: "Show which agent executable will be used and where it was found.".to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn status(runner: &AgentRunner) -> AgentStatus {
    let resolved = runner.resolve_executable();
    let config = runner.config();
    let on_path = which::which(BARE_COMMAND)
        .ok()
        .map(|p| p.display().to_string());
    AgentStatus {
        installed: resolved.source != ExecutableSource::BareCommand || on_path.is_some(),
        executable: resolved.path.display().to_string(),
        source: resolved.source.to_string(),
        on_path,
        runtime_version: config.effective_runtime_version().to_owned(),
        default_timeout_ms: config.default_timeout.as_millis(),
        working_directory: config.default_working_dir.display().to_string(),
    }
}

pub fn execute(runner: &AgentRunner, _arguments: serde_json::Value) -> Result<ToolCallResult> {
    let status = status(runner);
    let text = serde_json::to_string_pretty(&status).context("failed to serialize agent status")?;
    Ok(super::text_result(text, !status.installed))
}
