//! agentmesh -- MCP server exposing Cline-backed coding tools over stdio.
//!
//! Usage: agentmesh --workspace <path> [--cline-path <path>] [--node-version <vX.Y.Z>]

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use agentmesh::RunnerConfig;

#[derive(Debug, Parser)]
#[command(name = "agentmesh", version, about = "MCP server for Cline-backed coding tools")]
struct Args {
    /// Default working directory for agent tasks.
    #[arg(long, default_value = ".")]
    workspace: PathBuf,

    /// Explicit path to the cline executable (overrides CLINE_PATH).
    #[arg(long)]
    cline_path: Option<PathBuf>,

    /// Node version for the ~/.nvm fallback location (overrides NODE_VERSION).
    #[arg(long)]
    node_version: Option<String>,

    /// Default agent timeout in milliseconds (overrides CLINE_TIMEOUT_MS).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr so it does not interfere with MCP stdio.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = RunnerConfig::from_env();
    config.default_working_dir = args.workspace.canonicalize()?;
    if let Some(path) = args.cline_path {
        config.executable_override = Some(path);
    }
    if let Some(version) = args.node_version {
        config.runtime_version = Some(version);
    }
    if let Some(ms) = args.timeout_ms {
        config.default_timeout = Duration::from_millis(ms);
    }

    agentmesh::run_mcp_server(config)
}
