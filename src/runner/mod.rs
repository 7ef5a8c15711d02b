//! Agent task runner: the single path from a tool handler to the agent CLI.
//!
//! ```text
//! prompt + options → prepare() → ExecutionRequest → execute() → ExecutionResult
//!                     │                              │
//!                     ├ sanitize                     ├ resolve executable
//!                     └ validate working dir         ├ launch with timeout
//!                                                    └ extract answer
//! ```
//!
//! `prepare` is the only place a hard error can come from. Once a request is
//! built, every failure of the subprocess lifecycle is folded into a failed
//! [`ExecutionResult`]. There is no retry and no shared state between calls.

pub mod extract;
pub mod process;
pub mod resolver;
pub mod sanitize;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::error::{MeshError, MeshResult};

use self::extract::OutputExtractor;
use self::process::{LaunchSpec, ProcessLauncher, ProcessOutcome, SystemLauncher};
use self::resolver::{ExecutablePath, resolve_executable, validate_existing_path};

/// Environment override that keeps the agent's output free of terminal styling.
pub const PLAIN_OUTPUT_ENV: (&str, &str) = ("NO_COLOR", "1");

/// Agent operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Make changes.
    Act,
    /// Describe a plan without touching the workspace.
    Plan,
}

impl AgentMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Act => "act",
            Self::Plan => "plan",
        }
    }
}

/// Per-call execution options as supplied by a tool handler.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOptions {
    /// Pass `-y` to the agent (default: true).
    #[serde(default)]
    pub auto_approve: Option<bool>,
    #[serde(default)]
    pub mode: Option<AgentMode>,
    /// Relative paths are taken from the runner's default working directory.
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub timeout_millis: Option<u64>,
}

impl ExecutionOptions {
    /// Fill in `mode` only if the caller left it unset.
    #[must_use]
    pub fn with_default_mode(mut self, mode: AgentMode) -> Self {
        if self.mode.is_none() {
            self.mode = Some(mode);
        }
        self
    }
}

/// A validated, ready-to-launch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Sanitized prompt.
    pub prompt: String,
    pub working_directory: PathBuf,
    pub mode: Option<AgentMode>,
    pub auto_approve: bool,
    pub timeout: Duration,
}

/// Outcome of one agent invocation.
///
/// On failure `text` may still hold partial output captured before the
/// failure; `diagnostic` explains what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub succeeded: bool,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ExecutionResult {
    pub const fn success(text: String) -> Self {
        Self {
            succeeded: true,
            text,
            diagnostic: None,
        }
    }

    pub const fn failure(text: String, diagnostic: String) -> Self {
        Self {
            succeeded: false,
            text,
            diagnostic: Some(diagnostic),
        }
    }
}

/// Build the agent argument list for a request.
///
/// Shape: `[-y] [-m <mode>] --output-format json --oneshot <prompt>`.
pub fn build_args(request: &ExecutionRequest) -> Vec<String> {
    let mut args = Vec::with_capacity(7);
    if request.auto_approve {
        args.push("-y".to_owned());
    }
    if let Some(mode) = request.mode {
        args.push("-m".to_owned());
        args.push(mode.as_str().to_owned());
    }
    args.push("--output-format".to_owned());
    args.push("json".to_owned());
    args.push("--oneshot".to_owned());
    args.push(request.prompt.clone());
    args
}

/// Runs agent tasks against a configured environment.
pub struct AgentRunner {
    config: RunnerConfig,
    launcher: Arc<dyn ProcessLauncher>,
    extractor: OutputExtractor,
}

impl std::fmt::Debug for AgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRunner")
            .field("config", &self.config)
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

impl AgentRunner {
    /// Create a runner that launches real processes.
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_launcher(config, Arc::new(SystemLauncher))
    }

    /// Create a runner over a custom process-execution primitive.
    pub fn with_launcher(config: RunnerConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            config,
            launcher,
            extractor: OutputExtractor::default(),
        }
    }

    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Resolve the agent executable as the next invocation would.
    pub fn resolve_executable(&self) -> ExecutablePath {
        resolve_executable(&self.config)
    }

    /// Validate inputs and build a request. Nothing is spawned here.
    pub fn prepare(&self, prompt: &str, options: &ExecutionOptions) -> MeshResult<ExecutionRequest> {
        let prompt = sanitize::sanitize_prompt(prompt)?;

        let working_directory = match options.working_directory.as_deref() {
            Some(dir) => self.validate_working_dir(dir)?,
            None => self.config.default_working_dir.clone(),
        };

        let timeout = match options.timeout_millis {
            Some(0) => return Err(MeshError::InvalidTimeout),
            Some(ms) => Duration::from_millis(ms),
            None => self.config.default_timeout,
        };

        Ok(ExecutionRequest {
            prompt,
            working_directory,
            mode: options.mode,
            auto_approve: options.auto_approve.unwrap_or(true),
            timeout,
        })
    }

    /// Run one prepared request to completion. Never fails.
    pub fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let executable = self.resolve_executable();
        let spec = LaunchSpec {
            program: executable.path,
            args: build_args(request),
            working_dir: request.working_directory.clone(),
            env: vec![(PLAIN_OUTPUT_ENV.0.to_owned(), PLAIN_OUTPUT_ENV.1.to_owned())],
            timeout: request.timeout,
        };

        info!(
            program = %spec.program.display(),
            source = %executable.source,
            mode = request.mode.map_or("default", AgentMode::as_str),
            auto_approve = request.auto_approve,
            timeout_ms = request.timeout.as_millis(),
            cwd = %request.working_directory.display(),
            "running agent task"
        );

        let result = self.to_result(self.launcher.launch(&spec), request.timeout);
        if let Some(diagnostic) = &result.diagnostic {
            warn!(diagnostic = diagnostic.as_str(), "agent task failed");
        }
        result
    }

    /// [`prepare`](Self::prepare) then [`execute`](Self::execute).
    pub fn run(&self, prompt: &str, options: &ExecutionOptions) -> MeshResult<ExecutionResult> {
        let request = self.prepare(prompt, options)?;
        Ok(self.execute(&request))
    }

    fn validate_working_dir(&self, dir: &str) -> MeshResult<PathBuf> {
        let raw = Path::new(dir);
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.config.default_working_dir.join(raw)
        };
        let path = validate_existing_path(&joined).map_err(|e| MeshError::InvalidWorkingDirectory {
            path: joined.clone(),
            reason: e.to_string(),
        })?;
        if !path.is_dir() {
            return Err(MeshError::InvalidWorkingDirectory {
                path,
                reason: "not a directory".to_owned(),
            });
        }
        Ok(path)
    }

    fn to_result(&self, outcome: ProcessOutcome, timeout: Duration) -> ExecutionResult {
        match outcome {
            ProcessOutcome::Exited {
                code: Some(0),
                stdout,
                ..
            } => ExecutionResult::success(self.extractor.extract(&stdout).text),
            ProcessOutcome::Exited {
                code,
                stdout,
                stderr,
            } => {
                let diagnostic = if stderr.trim().is_empty() {
                    match code {
                        Some(c) => format!("agent exited with status {c}"),
                        None => "agent terminated by signal".to_owned(),
                    }
                } else {
                    stderr.trim().to_owned()
                };
                ExecutionResult::failure(stdout, diagnostic)
            }
            ProcessOutcome::TimedOut { stdout, .. } => ExecutionResult::failure(
                stdout,
                format!("agent timed out after {} ms", timeout.as_millis()),
            ),
            ProcessOutcome::SpawnFailed { message } => {
                ExecutionResult::failure(String::new(), message)
            }
        }
    }
}
