//! Executable resolver: locates the agent binary.
//!
//! Candidates are tried in order: explicit override, then the nvm-style
//! per-version install under the user's home, then the bare command name.
//! A candidate that fails validation is logged and skipped. Resolution never
//! fails; a broken bare command surfaces later as a spawn failure.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::config::RunnerConfig;

/// Command name used when no candidate path validates.
pub const BARE_COMMAND: &str = "cline";

/// Where the resolved executable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableSource {
    Override,
    RuntimeFallback,
    BareCommand,
}

impl std::fmt::Display for ExecutableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Override => "override",
            Self::RuntimeFallback => "runtime fallback",
            Self::BareCommand => "bare command",
        })
    }
}

/// A resolved agent executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutablePath {
    pub path: PathBuf,
    pub source: ExecutableSource,
}

/// Why a candidate path was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathRejection {
    #[error("path contains a parent-directory segment")]
    Traversal,
    #[error("path does not exist")]
    Missing,
}

/// Lexically normalize `path` and reject it if it traverses upward or is absent.
///
/// Normalization drops `.` segments and repeated separators. Any remaining
/// `..` segment is a rejection, even one that would stay inside the root.
pub fn validate_existing_path(path: &Path) -> Result<PathBuf, PathRejection> {
    let normalized: PathBuf = path.components().collect();
    if normalized
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(PathRejection::Traversal);
    }
    if !normalized.exists() {
        return Err(PathRejection::Missing);
    }
    Ok(normalized)
}

/// The nvm install location for `cline` under a given node version.
pub fn runtime_fallback_path(home: &Path, version: &str) -> PathBuf {
    home.join(".nvm")
        .join("versions")
        .join("node")
        .join(version)
        .join("bin")
        .join(BARE_COMMAND)
}

type Candidate<'a> = (ExecutableSource, Box<dyn Fn() -> Option<PathBuf> + 'a>);

/// Resolve the agent executable for one invocation. Nothing is cached.
pub fn resolve_executable(config: &RunnerConfig) -> ExecutablePath {
    let candidates: [Candidate<'_>; 2] = [
        (
            ExecutableSource::Override,
            Box::new(|| config.executable_override.clone()),
        ),
        (
            ExecutableSource::RuntimeFallback,
            Box::new(|| {
                config
                    .home_dir
                    .as_deref()
                    .map(|home| runtime_fallback_path(home, config.effective_runtime_version()))
            }),
        ),
    ];

    for (source, produce) in &candidates {
        let Some(candidate) = produce() else {
            continue;
        };
        match validate_existing_path(&candidate) {
            Ok(path) => {
                debug!(path = %path.display(), %source, "resolved agent executable");
                return ExecutablePath {
                    path,
                    source: *source,
                };
            }
            Err(reason) => {
                warn!(
                    path = %candidate.display(),
                    %source,
                    %reason,
                    "rejected agent executable candidate"
                );
            }
        }
    }

    debug!(command = BARE_COMMAND, "falling back to bare agent command");
    ExecutablePath {
        path: PathBuf::from(BARE_COMMAND),
        source: ExecutableSource::BareCommand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(home: Option<PathBuf>, override_path: Option<PathBuf>) -> RunnerConfig {
        RunnerConfig {
            executable_override: override_path,
            runtime_version: None,
            home_dir: home,
            ..RunnerConfig::default()
        }
    }

    #[test]
    fn traversal_rejected_before_existence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).expect("mkdir");
        // Exists on disk, still rejected.
        let sneaky = sub.join("..").join("sub");
        assert_eq!(
            validate_existing_path(&sneaky),
            Err(PathRejection::Traversal)
        );
    }

    #[test]
    fn missing_path_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            validate_existing_path(&dir.path().join("nope")),
            Err(PathRejection::Missing)
        );
    }

    #[test]
    fn current_dir_segments_normalized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dotted = dir.path().join(".").join(".");
        let normalized = validate_existing_path(&dotted).expect("valid");
        assert_eq!(normalized, dir.path().to_path_buf());
    }

    #[test]
    fn override_wins_when_valid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bin = dir.path().join("my-cline");
        std::fs::write(&bin, "").expect("write");

        let resolved = resolve_executable(&config_with(None, Some(bin.clone())));
        assert_eq!(resolved.source, ExecutableSource::Override);
        assert_eq!(resolved.path, bin);
    }

    #[test]
    fn invalid_override_falls_through_to_runtime_fallback() {
        let home = tempfile::tempdir().expect("tempdir");
        let fallback = runtime_fallback_path(home.path(), crate::config::DEFAULT_RUNTIME_VERSION);
        std::fs::create_dir_all(fallback.parent().expect("parent")).expect("mkdir");
        std::fs::write(&fallback, "").expect("write");

        let traversal = home.path().join("..").join("cline");
        let resolved = resolve_executable(&config_with(
            Some(home.path().to_path_buf()),
            Some(traversal),
        ));
        assert_eq!(resolved.source, ExecutableSource::RuntimeFallback);
        assert_eq!(resolved.path, fallback);
    }

    #[test]
    fn nothing_valid_yields_bare_command() {
        let home = tempfile::tempdir().expect("tempdir");
        let resolved = resolve_executable(&config_with(
            Some(home.path().to_path_buf()),
            Some(home.path().join("missing-cline")),
        ));
        assert_eq!(resolved.source, ExecutableSource::BareCommand);
        assert_eq!(resolved.path, PathBuf::from(BARE_COMMAND));
    }

    #[test]
    fn fallback_path_layout() {
        let path = runtime_fallback_path(Path::new("/home/dev"), "v20.1.0");
        assert_eq!(
            path,
            PathBuf::from("/home/dev/.nvm/versions/node/v20.1.0/bin/cline")
        );
    }
}
