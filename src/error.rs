//! Error types for the agentmesh crate.

use std::path::PathBuf;

/// Hard failures raised before any agent process is spawned.
///
/// Anything that goes wrong inside the subprocess lifecycle is reported as a
/// failed [`ExecutionResult`](crate::runner::ExecutionResult) instead.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// Prompt was empty, or nothing survived sanitization.
    #[error("prompt is empty")]
    EmptyPrompt,

    /// Prompt exceeds the argument length ceiling.
    #[error("prompt too long: {len} characters (max {max})")]
    PromptTooLong { len: usize, max: usize },

    /// Working directory is missing or contains a traversal segment.
    #[error("invalid working directory {path}: {reason}")]
    InvalidWorkingDirectory { path: PathBuf, reason: String },

    /// Timeout of zero milliseconds.
    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    /// Tool arguments failed validation.
    #[error("invalid {tool} parameters: {reason}")]
    InvalidParams { tool: String, reason: String },
}

/// Convenience result type for agentmesh operations.
pub type MeshResult<T> = Result<T, MeshError>;
