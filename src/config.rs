//! Runner configuration.
//!
//! Everything the runner would otherwise read ad hoc from the process
//! environment lives here and is passed into [`AgentRunner`] explicitly.
//!
//! [`AgentRunner`]: crate::runner::AgentRunner

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::warn;

/// Env var holding an explicit path to the agent executable.
pub const ENV_EXECUTABLE: &str = "CLINE_PATH";
/// Env var holding the node runtime version used for the nvm fallback path.
pub const ENV_RUNTIME_VERSION: &str = "NODE_VERSION";
/// Env var holding the default timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "CLINE_TIMEOUT_MS";

/// Runtime version used when none is configured or the configured one is malformed.
pub const DEFAULT_RUNTIME_VERSION: &str = "v22.14.0";

/// Default subprocess timeout (5 minutes).
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

static RUNTIME_VERSION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^v\d+\.\d+\.\d+$").ok());

/// Configuration for the agent task runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Explicit executable path, tried first.
    pub executable_override: Option<PathBuf>,
    /// Node version string (`v<major>.<minor>.<patch>`) for the nvm fallback.
    pub runtime_version: Option<String>,
    /// Home directory the nvm fallback is rooted at.
    pub home_dir: Option<PathBuf>,
    /// Timeout applied when a request does not carry one.
    pub default_timeout: Duration,
    /// Working directory applied when a request does not carry one.
    pub default_working_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            executable_override: None,
            runtime_version: None,
            home_dir: dirs::home_dir(),
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            default_working_dir: PathBuf::from("."),
        }
    }
}

impl RunnerConfig {
    /// Build a config from `CLINE_PATH`, `NODE_VERSION` and `CLINE_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut config = Self {
            executable_override: non_empty_env(ENV_EXECUTABLE).map(PathBuf::from),
            runtime_version: non_empty_env(ENV_RUNTIME_VERSION),
            ..Self::default()
        };
        if let Some(raw) = non_empty_env(ENV_TIMEOUT_MS) {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config.default_timeout = Duration::from_millis(ms),
                _ => warn!(value = raw, "ignoring invalid {ENV_TIMEOUT_MS}"),
            }
        }
        config
    }

    /// The configured runtime version if well-formed, else [`DEFAULT_RUNTIME_VERSION`].
    pub fn effective_runtime_version(&self) -> &str {
        match self.runtime_version.as_deref() {
            Some(v) if is_valid_runtime_version(v) => v,
            Some(v) => {
                warn!(version = v, "malformed runtime version, using default");
                DEFAULT_RUNTIME_VERSION
            }
            None => DEFAULT_RUNTIME_VERSION,
        }
    }
}

/// Check a version string against `v<major>.<minor>.<patch>`.
pub fn is_valid_runtime_version(version: &str) -> bool {
    RUNTIME_VERSION_RE
        .as_ref()
        .is_some_and(|re| re.is_match(version))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_version_pattern() {
        assert!(is_valid_runtime_version("v20.11.1"));
        assert!(is_valid_runtime_version("v8.0.0"));
        assert!(!is_valid_runtime_version("20.11.1"));
        assert!(!is_valid_runtime_version("v20.11"));
        assert!(!is_valid_runtime_version("v20.11.1/../../etc"));
        assert!(!is_valid_runtime_version(""));
    }

    #[test]
    fn malformed_version_falls_back_to_default() {
        let config = RunnerConfig {
            runtime_version: Some("latest".to_owned()),
            ..RunnerConfig::default()
        };
        assert_eq!(config.effective_runtime_version(), DEFAULT_RUNTIME_VERSION);

        let config = RunnerConfig {
            runtime_version: Some("v18.19.0".to_owned()),
            ..RunnerConfig::default()
        };
        assert_eq!(config.effective_runtime_version(), "v18.19.0");
    }

    #[test]
    fn default_timeout_is_five_minutes() {
        assert_eq!(
            RunnerConfig::default().default_timeout,
            Duration::from_secs(300)
        );
    }
}
