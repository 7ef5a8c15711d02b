//! Workflow tool: runs several agent steps in sequence.
//!
//! Every step is validated before the first one starts. Steps then run one at
//! a time; step N+1 only starts after step N succeeded, and the first failure
//! halts the workflow.

use anyhow::Result;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::MeshError;
use crate::runner::{AgentMode, AgentRunner, ExecutionOptions, ExecutionRequest, ExecutionResult};
use crate::server::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "run_workflow";

/// Upper bound on steps per workflow.
pub const MAX_STEPS: usize = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    /// Label used in the report.
    #[serde(default)]
    pub name: Option<String>,
    pub prompt: String,
    /// Overrides the workflow-level mode for this step.
    #[serde(default)]
    pub mode: Option<AgentMode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowParams {
    pub steps: Vec<WorkflowStep>,
    #[serde(flatten)]
    pub options: ExecutionOptions,
}

/// Result of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub label: String,
    pub result: ExecutionResult,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_owned(),
        description: "Run a sequence of agent tasks in order. Stops at the first failing step."
            .to_owned(),
        input_schema: super::with_execution_options(serde_json::json!({
            "type": "object",
            "properties": {
                "steps": {
                    "type": "array",
                    "minItems": 1,
                    "maxItems": MAX_STEPS,
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "description": "Step label" },
                            "prompt": { "type": "string", "description": "Task for the agent" },
                            "mode": { "type": "string", "enum": ["act", "plan"] }
                        },
                        "required": ["prompt"]
                    }
                }
            },
            "required": ["steps"]
        })),
    }
}

/// Validate every step up front. Nothing is spawned.
pub fn prepare_steps(
    runner: &AgentRunner,
    params: &WorkflowParams,
) -> Result<Vec<(String, ExecutionRequest)>> {
    if params.steps.is_empty() || params.steps.len() > MAX_STEPS {
        return Err(MeshError::InvalidParams {
            tool: NAME.to_owned(),
            reason: format!(
                "expected 1 to {MAX_STEPS} steps, got {}",
                params.steps.len()
            ),
        }
        .into());
    }

    params
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| -> Result<(String, ExecutionRequest)> {
            let label = step
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("step {}", i + 1));
            let mut options = params.options.clone();
            if step.mode.is_some() {
                options.mode = step.mode;
            }
            let request = runner.prepare(&step.prompt, &options)?;
            Ok((label, request))
        })
        .collect()
}

/// Execute prepared steps in order, stopping after the first failure.
pub fn run_steps(runner: &AgentRunner, steps: Vec<(String, ExecutionRequest)>) -> Vec<StepReport> {
    let total = steps.len();
    let mut reports = Vec::with_capacity(total);
    for (index, (label, request)) in steps.into_iter().enumerate() {
        info!(step = index + 1, total, label = label.as_str(), "workflow step starting");
        let result = runner.execute(&request);
        let failed = !result.succeeded;
        reports.push(StepReport { label, result });
        if failed {
            warn!(step = index + 1, total, "workflow halted");
            break;
        }
    }
    reports
}

pub fn render(reports: &[StepReport], total: usize) -> ToolCallResult {
    let mut text = String::new();
    for (i, report) in reports.iter().enumerate() {
        let status = if report.result.succeeded { "ok" } else { "FAILED" };
        text.push_str(&format!("## Step {}/{total}: {} [{status}]\n", i + 1, report.label));
        if let Some(diagnostic) = &report.result.diagnostic {
            text.push_str(&format!("Error: {diagnostic}\n"));
        }
        if !report.result.text.trim().is_empty() {
            text.push_str(&report.result.text);
            text.push('\n');
        }
        text.push('\n');
    }

    let failed = reports.last().is_some_and(|r| !r.result.succeeded);
    if failed {
        text.push_str(&format!(
            "Workflow halted at step {} of {total}.",
            reports.len()
        ));
    } else {
        text.push_str(&format!("Workflow completed: {total} steps."));
    }
    super::text_result(text, failed)
}

pub fn execute(runner: &AgentRunner, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: WorkflowParams = super::parse_params(NAME, arguments)?;
    let steps = prepare_steps(runner, &params)?;
    let total = steps.len();
    let reports = run_steps(runner, steps);
    Ok(render(&reports, total))
}
