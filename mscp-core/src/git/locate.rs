//! Local clone detection

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{Config, GeneratorConfig};
use crate::process::{CommandRunner, CommandSpec};
use crate::{Error, Result};

/// Branch name reported when HEAD cannot be read
pub const UNKNOWN_BRANCH: &str = "unknown";

/// Snapshot of the on-disk clone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryState {
    /// Absolute location of the clone
    pub path: PathBuf,
    /// Whether anything exists at `path`
    pub exists: bool,
    /// An existing directory with no entries; safe to clone into
    pub is_empty: bool,
    /// Checked-out branch; only queried for valid clones
    pub current_branch: Option<String>,
    /// Whether the generator script is present
    pub is_valid_clone: bool,
}

/// Expand `~` and make `input` absolute against the current directory
pub fn expand_path(input: &str) -> PathBuf {
    let input = input.trim();

    let expanded = if input == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(input))
    } else if let Some(rest) = input.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(input),
        }
    } else {
        PathBuf::from(input)
    };

    if expanded.is_absolute() {
        expanded
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(expanded),
            Err(_) => expanded,
        }
    }
}

/// Reads repository state without modifying anything
#[derive(Clone)]
pub struct RepoLocator {
    runner: Arc<dyn CommandRunner>,
    generator: GeneratorConfig,
    rev_parse_timeout: Duration,
}

impl std::fmt::Debug for RepoLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoLocator")
            .field("script", &self.generator.script)
            .field("rev_parse_timeout", &self.rev_parse_timeout)
            .finish_non_exhaustive()
    }
}

impl RepoLocator {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config) -> Self {
        Self {
            runner,
            generator: config.generator.clone(),
            rev_parse_timeout: config.timeouts.rev_parse,
        }
    }

    /// Whether `path` holds an mSCP checkout (the generator script exists)
    pub fn is_valid_clone(&self, path: &Path) -> bool {
        self.generator.script_path(path).is_file()
    }

    /// Resolve a user-supplied path and describe what is there
    ///
    /// A failed branch query degrades to [`UNKNOWN_BRANCH`].
    pub async fn locate(&self, input: &str) -> RepositoryState {
        self.inspect(&expand_path(input)).await
    }

    /// Describe an already-resolved path
    pub async fn inspect(&self, path: &Path) -> RepositoryState {
        let exists = path.exists();
        let is_valid_clone = exists && self.is_valid_clone(path);

        let current_branch = if is_valid_clone {
            match self.current_branch(path).await {
                Ok(branch) => Some(branch),
                Err(e) => {
                    tracing::debug!(path = %path.display(), "Could not read current branch: {}", e);
                    Some(UNKNOWN_BRANCH.to_string())
                }
            }
        } else {
            None
        };

        RepositoryState {
            path: path.to_path_buf(),
            exists,
            is_empty: exists && is_empty_dir(path),
            current_branch,
            is_valid_clone,
        }
    }

    /// Query the checked-out branch with `git rev-parse --abbrev-ref HEAD`
    pub async fn current_branch(&self, path: &Path) -> Result<String> {
        let spec = CommandSpec::new("git")
            .args(["rev-parse", "--abbrev-ref", "HEAD"])
            .current_dir(path)
            .timeout(self.rev_parse_timeout);

        let output = self.runner.run(&spec).await?;
        let branch = output.stdout.trim();
        if !output.success() || branch.is_empty() {
            return Err(Error::ExternalFailure {
                command: spec.to_string(),
                code: output.code,
                output: output.combined(),
            });
        }

        Ok(branch.to_string())
    }

    /// Root of the work tree git resolves from `path`
    ///
    /// git searches upwards, so for a plain directory inside another
    /// checkout this is the enclosing repository.
    pub async fn toplevel(&self, path: &Path) -> Result<PathBuf> {
        let spec = CommandSpec::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .timeout(self.rev_parse_timeout);

        let output = self.runner.run(&spec).await?;
        let top = output.stdout.trim();
        if !output.success() || top.is_empty() {
            return Err(Error::PreconditionUnmet(format!(
                "{} exists but is not a git clone. Remove it or choose an empty directory.",
                path.display()
            )));
        }

        Ok(PathBuf::from(top))
    }

    /// Fail unless `path` is the root of its own work tree
    ///
    /// Must pass before any command that changes the repository runs there.
    pub async fn ensure_repository_root(&self, path: &Path) -> Result<()> {
        let top = self.toplevel(path).await?;
        let same = match (path.canonicalize(), top.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => path == top,
        };

        if same {
            Ok(())
        } else {
            tracing::warn!(
                path = %path.display(),
                toplevel = %top.display(),
                "Path lies inside another repository"
            );
            Err(Error::PreconditionUnmet(format!(
                "{} is not a clone itself but lies inside the repository at {}. Refusing to run git there.",
                path.display(),
                top.display()
            )))
        }
    }
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
