//! Process invoker: runs the agent with a bounded lifetime.
//!
//! Output is buffered in full and returned once the process exits. Both pipes
//! are drained by reader threads while the parent polls for exit, so a chatty
//! agent cannot stall on a full pipe, and whatever was captured before a
//! timeout kill is still available.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// Interval between exit-status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to wait for the pipes to drain after the process is gone.
///
/// A detached grandchild may keep a pipe open. When the grace expires the
/// reader threads are left detached: they keep appending to their buffer
/// until that pipe closes, and output after the snapshot is dropped.
const READER_GRACE: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8192;

/// Everything needed to launch one process.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Variables layered over the inherited environment.
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

/// How a launched process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process exited on its own. `code` is `None` when killed by a signal.
    Exited {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The timeout fired and the process was killed.
    TimedOut { stdout: String, stderr: String },
    /// The process could not be started, or waiting on it failed.
    SpawnFailed { message: String },
}

/// Process-execution primitive used by the runner.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, spec: &LaunchSpec) -> ProcessOutcome;
}

/// [`ProcessLauncher`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

enum WaitResult {
    Exited(ExitStatus),
    TimedOut,
    Failed(std::io::Error),
}

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, spec: &LaunchSpec) -> ProcessOutcome {
        let mut child = match Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return ProcessOutcome::SpawnFailed {
                    message: format!("failed to spawn {}: {e}", spec.program.display()),
                };
            }
        };

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();
        let mut readers = 0usize;
        if let Some(pipe) = child.stdout.take() {
            spawn_reader(pipe, Arc::clone(&stdout_buf), done_tx.clone());
            readers += 1;
        }
        if let Some(pipe) = child.stderr.take() {
            spawn_reader(pipe, Arc::clone(&stderr_buf), done_tx.clone());
            readers += 1;
        }
        drop(done_tx);

        let start = Instant::now();
        let wait = loop {
            match child.try_wait() {
                Ok(Some(status)) => break WaitResult::Exited(status),
                Ok(None) if start.elapsed() >= spec.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    break WaitResult::TimedOut;
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    break WaitResult::Failed(e);
                }
            }
        };

        let deadline = Instant::now() + READER_GRACE;
        for _ in 0..readers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if done_rx.recv_timeout(remaining).is_err() {
                // Readers still running are abandoned, not joined.
                warn!(program = %spec.program.display(), "output pipes still open after exit");
                break;
            }
        }

        let stdout = snapshot(&stdout_buf);
        let stderr = snapshot(&stderr_buf);
        debug!(
            program = %spec.program.display(),
            elapsed_ms = start.elapsed().as_millis(),
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "agent process finished"
        );

        match wait {
            WaitResult::Exited(status) => ProcessOutcome::Exited {
                code: status.code(),
                stdout,
                stderr,
            },
            WaitResult::TimedOut => ProcessOutcome::TimedOut { stdout, stderr },
            WaitResult::Failed(e) => ProcessOutcome::SpawnFailed {
                message: format!("failed to wait on {}: {e}", spec.program.display()),
            },
        }
    }
}

fn spawn_reader(
    mut pipe: impl Read + Send + 'static,
    buf: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Sender<()>,
) {
    std::thread::spawn(move || {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => buf
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
            }
        }
        let _ = done.send(());
    });
}

fn snapshot(buf: &Mutex<Vec<u8>>) -> String {
    let bytes = buf.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str, timeout: Duration) -> LaunchSpec {
        LaunchSpec {
            program: PathBuf::from("sh"),
            args: vec!["-c".to_owned(), script.to_owned()],
            working_dir: std::env::temp_dir(),
            env: Vec::new(),
            timeout,
        }
    }

    #[test]
    fn captures_both_streams() {
        let outcome = SystemLauncher.launch(&sh("echo out; echo err >&2", Duration::from_secs(10)));
        assert_eq!(
            outcome,
            ProcessOutcome::Exited {
                code: Some(0),
                stdout: "out\n".to_owned(),
                stderr: "err\n".to_owned(),
            }
        );
    }

    #[test]
    fn reports_nonzero_exit() {
        let outcome = SystemLauncher.launch(&sh("echo partial; exit 3", Duration::from_secs(10)));
        match outcome {
            ProcessOutcome::Exited { code, stdout, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stdout, "partial\n");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn timeout_keeps_partial_stdout() {
        let start = Instant::now();
        let outcome =
            SystemLauncher.launch(&sh("echo early; sleep 10", Duration::from_millis(300)));
        assert!(start.elapsed() < Duration::from_secs(8));
        match outcome {
            ProcessOutcome::TimedOut { stdout, .. } => assert_eq!(stdout, "early\n"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_spawn_failure() {
        let spec = LaunchSpec {
            program: PathBuf::from("/nonexistent/agentmesh-test-binary"),
            args: Vec::new(),
            working_dir: std::env::temp_dir(),
            env: Vec::new(),
            timeout: Duration::from_secs(1),
        };
        match SystemLauncher.launch(&spec) {
            ProcessOutcome::SpawnFailed { message } => {
                assert!(message.contains("agentmesh-test-binary"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn env_and_working_dir_applied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut spec = sh("printf '%s' \"$MESH_TEST_VAR\"; pwd", Duration::from_secs(10));
        spec.working_dir = dir.path().to_path_buf();
        spec.env.push(("MESH_TEST_VAR".to_owned(), "42".to_owned()));

        match SystemLauncher.launch(&spec) {
            ProcessOutcome::Exited { stdout, .. } => {
                assert!(stdout.starts_with("42"));
                let name = dir.path().file_name().expect("name").to_string_lossy().into_owned();
                assert!(stdout.contains(&name));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
