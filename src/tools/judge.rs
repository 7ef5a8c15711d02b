//! Quality judge tool: heuristic scoring of code output.
//!
//! Runs locally with no agent call. Each criterion starts at 5 and gains 2
//! per satisfied factor, clamped to 1..=10; the overall score is the rounded
//! mean of the five criteria.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::server::{ToolCallResult, ToolDefinition};

pub const NAME: &str = "judge_quality";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeParams {
    /// Code or tool output to evaluate.
    pub content: String,
    /// What the content was supposed to do.
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CriteriaScores {
    pub code_quality: u8,
    pub security: u8,
    pub performance: u8,
    pub correctness: u8,
    pub maintainability: u8,
}

impl CriteriaScores {
    const fn total(self) -> u32 {
        self.code_quality as u32
            + self.security as u32
            + self.performance as u32
            + self.correctness as u32
            + self.maintainability as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub overall_score: u8,
    pub criteria_scores: CriteriaScores,
    pub feedback: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub note: String,
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_owned(),
        description: "Score code or tool output on code quality, security, performance, \
            correctness and maintainability (1-10 each) using local heuristics."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Code or output to evaluate"
                },
                "context": {
                    "type": "string",
                    "description": "Task the content was produced for"
                }
            },
            "required": ["content"]
        }),
    }
}

fn score(factors: &[bool]) -> u8 {
    let hits = factors.iter().filter(|&&f| f).count();
    let raw = 5 + 2 * hits;
    u8::try_from(raw.clamp(1, 10)).unwrap_or(10)
}

/// Score `content` with the pattern heuristics.
pub fn evaluate(content: &str, context: Option<String>) -> QualityReport {
    let lower = content.to_lowercase();
    let len = content.chars().count();

    let has_comments = content.contains("//") || content.contains("/*") || content.contains('#');
    let has_error_handling =
        content.contains("try") || content.contains("catch") || lower.contains("error");
    let has_types =
        content.contains(": ") || content.contains("type ") || content.contains("interface ");
    let has_tests = lower.contains("test") || content.contains("expect") || content.contains("assert");
    let has_docs = content.contains("\"\"\"") || content.contains("'''") || content.contains("/**");

    let scores = CriteriaScores {
        code_quality: score(&[has_comments, has_types, len > 50]),
        security: score(&[
            has_error_handling,
            !content.contains("eval("),
            !content.contains("innerHTML"),
        ]),
        performance: score(&[!lower.contains("nested"), len < 5000]),
        correctness: score(&[has_error_handling, has_types]),
        maintainability: score(&[has_comments, has_tests, has_docs]),
    };

    // Five integer scores never average to an exact half, so +2 then /5 rounds.
    let overall = u8::try_from((scores.total() + 2) / 5).unwrap_or(10);

    let mut feedback = Vec::new();
    if scores.code_quality >= 7 {
        feedback.push("Code structure looks good".to_owned());
    } else {
        feedback.push("Consider improving code structure and adding comments".to_owned());
    }
    if scores.security >= 7 {
        feedback.push("No obvious security issues detected".to_owned());
    } else {
        feedback.push("Review security practices".to_owned());
    }

    let mut recommendations = Vec::new();
    if !has_comments {
        recommendations.push("Add comments to explain complex logic".to_owned());
    }
    if !has_error_handling {
        recommendations.push("Add error handling for edge cases".to_owned());
    }
    if !has_types {
        recommendations.push("Consider adding type annotations".to_owned());
    }
    if recommendations.is_empty() {
        recommendations.push("Code looks good!".to_owned());
    }

    QualityReport {
        overall_score: overall,
        criteria_scores: scores,
        feedback,
        recommendations,
        context: context.filter(|c| !c.trim().is_empty()),
        note: "Heuristic evaluation".to_owned(),
    }
}

pub fn execute(arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: JudgeParams = super::parse_params(NAME, arguments)?;
    let report = evaluate(&params.content, params.context);
    let text = serde_json::to_string_pretty(&report).context("failed to serialize quality report")?;
    Ok(super::text_result(text, false))
}
