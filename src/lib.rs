//! `agentmesh`: MCP tool server that delegates coding tasks to the Cline CLI.
//!
//! Each agent-backed tool turns its arguments into a prompt and hands it to
//! the [`runner::AgentRunner`], which finds the `cline` executable, sanitizes
//! the prompt, runs the agent with a timeout and pulls the answer out of its
//! JSON event stream.
//!
//! # Tools
//!
//! - `code_review`, `security_audit`: plan-mode analysis
//! - `refactor`, `generate_tests`, `generate_docs`, `git_assist`, `scaffold`
//! - `run_workflow`: sequential multi-step agent runs
//! - `judge_quality`: local heuristic scoring, no agent call
//! - `agent_status`: executable resolution report
//!
//! # Architecture
//!
//! ```text
//! stdin (JSON-RPC) → McpServer → ToolRouter → tool handler
//!                                                  ↓
//!                                             AgentRunner → cline subprocess
//! stdout (JSON-RPC) ←──────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod runner;
pub mod server;
pub mod tools;

pub use config::RunnerConfig;
pub use error::{MeshError, MeshResult};
pub use runner::{AgentRunner, ExecutionOptions, ExecutionResult};
pub use server::run_mcp_server;
