//! Repository synchronisation: clone, switch branch or fast-forward pull
//!
//! The action is chosen purely from two observations of the local clone:
//! does the path exist, and does its checked-out branch match the request.
//! An empty directory counts as absent. Switch and pull only run once the
//! path is confirmed to be the root of its own work tree, never in an
//! enclosing repository.
//! Every sync, successful or not, publishes a fresh [`SyncToken`] so views
//! derived from the clone know to recompute.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use super::locate::RepoLocator;
use super::remote::RemoteUrl;
use crate::config::{Config, TimeoutConfig};
use crate::process::{CommandRunner, CommandSpec};
use crate::{Error, ErrorKind, Result};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Opaque marker identifying one completed sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SyncToken(u64);

impl SyncToken {
    /// Token published before any sync has run
    pub const INITIAL: SyncToken = SyncToken(0);

    fn next() -> Self {
        SyncToken(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// What a sync will do to the local clone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum SyncAction {
    /// Nothing at the path yet: shallow clone of the branch
    Clone,
    /// A clone on another (or unreadable) branch: fetch and check out
    Switch { from: Option<String> },
    /// Already on the branch: fast-forward only
    Pull,
}

impl SyncAction {
    /// Pick the action for a path that does or does not exist and its current branch
    pub fn decide(exists: bool, current_branch: Option<&str>, desired: &str) -> Self {
        if !exists {
            return SyncAction::Clone;
        }

        match current_branch {
            Some(current) if current == desired => SyncAction::Pull,
            other => SyncAction::Switch {
                from: other.map(str::to_string),
            },
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Clone => f.write_str("clone"),
            SyncAction::Switch { .. } => f.write_str("switch"),
            SyncAction::Pull => f.write_str("pull"),
        }
    }
}

/// Immutable description of one sync request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Resolved clone location
    pub repo_path: PathBuf,
    /// Branch the clone should end up on
    pub branch: String,
}

impl SyncRequest {
    pub fn new(repo_path: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            branch: branch.into(),
        }
    }
}

/// Why a sync stopped early
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Result of a sync attempt
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    /// Action that was chosen
    pub action: SyncAction,
    /// All command output in execution order
    pub combined_log: String,
    pub succeeded: bool,
    /// Fresh for every attempt, including failed ones
    pub token: SyncToken,
    /// Set when `succeeded` is false
    pub failure: Option<SyncFailure>,
}

/// Brings the local clone onto the requested branch
pub struct SyncController {
    runner: Arc<dyn CommandRunner>,
    locator: RepoLocator,
    remote: RemoteUrl,
    timeouts: TimeoutConfig,
    completed: watch::Sender<SyncToken>,
}

impl fmt::Debug for SyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncController")
            .field("remote", &self.remote.clone_url)
            .field("last_token", &*self.completed.borrow())
            .finish_non_exhaustive()
    }
}

impl SyncController {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config) -> Result<Self> {
        let remote = RemoteUrl::parse(&config.repository.remote)?;
        let (completed, _) = watch::channel(SyncToken::INITIAL);

        Ok(Self {
            locator: RepoLocator::new(runner.clone(), config),
            runner,
            remote,
            timeouts: config.timeouts.clone(),
            completed,
        })
    }

    /// Receive a notification after every sync
    pub fn subscribe(&self) -> watch::Receiver<SyncToken> {
        self.completed.subscribe()
    }

    /// Token of the most recent sync
    pub fn last_token(&self) -> SyncToken {
        *self.completed.borrow()
    }

    /// Decide what a sync would do right now
    pub async fn plan(&self, request: &SyncRequest) -> SyncAction {
        let state = self.locator.inspect(&request.repo_path).await;
        SyncAction::decide(
            state.exists && !state.is_empty,
            state.current_branch.as_deref(),
            &request.branch,
        )
    }

    /// Run the sync; never fails outright, failures are in the outcome
    pub async fn sync(&self, request: &SyncRequest) -> SyncOutcome {
        let action = self.plan(request).await;
        tracing::info!(
            action = %action,
            branch = %request.branch,
            path = %request.repo_path.display(),
            "Starting repository sync"
        );

        let mut log = String::new();
        let result = match action {
            SyncAction::Clone => self.clone_branch(request, &mut log).await,
            SyncAction::Switch { ref from } => {
                self.switch_branch(request, from.as_deref(), &mut log).await
            }
            SyncAction::Pull => self.pull(request, &mut log).await,
        };

        let failure = match result {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(action = %action, branch = %request.branch, "Sync failed: {}", e);
                log.push_str(&format!("\n\nError: {}", e));
                Some(SyncFailure {
                    kind: e.kind(),
                    message: e.to_string(),
                })
            }
        };

        let token = SyncToken::next();
        self.completed.send_replace(token);

        SyncOutcome {
            action,
            combined_log: log,
            succeeded: failure.is_none(),
            token,
            failure,
        }
    }

    async fn clone_branch(&self, request: &SyncRequest, log: &mut String) -> Result<()> {
        tracing::info!(
            branch = %request.branch,
            origin = %self.remote.summary(),
            path = %request.repo_path.display(),
            "Cloning"
        );
        log.push_str(&format!("Cloning mSCP ({})...\n\n", request.branch));

        let spec = CommandSpec::new("git")
            .args(["clone", "--depth", "1", "-b", request.branch.as_str()])
            .arg(self.remote.clone_url.as_str())
            .arg(request.repo_path.to_string_lossy().into_owned())
            .timeout(self.timeouts.clone);
        self.step(spec, log).await?;

        log.push_str(&format!("\n\nReady: mSCP ({})", request.branch));
        Ok(())
    }

    async fn switch_branch(
        &self,
        request: &SyncRequest,
        from: Option<&str>,
        log: &mut String,
    ) -> Result<()> {
        log.push_str(&format!(
            "Switching from {} to {}...\n\n",
            from.unwrap_or("an unknown branch"),
            request.branch
        ));

        let repo = &request.repo_path;
        let branch = request.branch.as_str();
        self.locator.ensure_repository_root(repo).await?;

        self.step(
            git_in(repo)
                .args(["remote", "set-branches", "--add", "origin", branch])
                .timeout(self.timeouts.set_branches),
            log,
        )
        .await?;
        self.step(
            git_in(repo)
                .args(["fetch", "--depth", "1", "origin", branch])
                .timeout(self.timeouts.fetch),
            log,
        )
        .await?;
        self.step(
            git_in(repo)
                .args(["checkout", branch])
                .timeout(self.timeouts.checkout),
            log,
        )
        .await?;

        log.push_str(&format!("\n\nSwitched to: mSCP ({})", branch));
        Ok(())
    }

    async fn pull(&self, request: &SyncRequest, log: &mut String) -> Result<()> {
        log.push_str(&format!("Already on {}. Updating...\n\n", request.branch));
        self.locator.ensure_repository_root(&request.repo_path).await?;

        self.step(
            git_in(&request.repo_path)
                .args(["pull", "--ff-only"])
                .timeout(self.timeouts.pull),
            log,
        )
        .await?;

        log.push_str("\n\nRepository up to date.");
        Ok(())
    }

    /// Run one command, appending whatever it printed
    async fn step(&self, spec: CommandSpec, log: &mut String) -> Result<()> {
        match self.runner.run(&spec).await {
            Ok(output) => {
                log.push_str(&output.combined());
                if output.success() {
                    Ok(())
                } else {
                    Err(Error::ExternalFailure {
                        command: spec.to_string(),
                        code: output.code,
                        output: output.combined(),
                    })
                }
            }
            Err(e) => {
                if let Some(partial) = e.output() {
                    log.push_str(partial);
                }
                Err(e)
            }
        }
    }
}

fn git_in(repo: &Path) -> CommandSpec {
    CommandSpec::new("git").current_dir(repo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::ScriptedRunner;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn make_clone(dir: &Path) {
        fs::create_dir_all(dir.join("scripts")).unwrap();
        fs::write(dir.join("scripts/generate_guidance.py"), "# generator").unwrap();
    }

    /// `git rev-parse --show-toplevel` output for `dir`
    fn toplevel(dir: &Path) -> String {
        format!("{}\n", dir.display())
    }

    fn controller(runner: &Arc<ScriptedRunner>) -> SyncController {
        SyncController::new(runner.clone(), &Config::default()).unwrap()
    }

    #[test]
    fn test_decide_is_total() {
        assert_eq!(SyncAction::decide(false, None, "sequoia"), SyncAction::Clone);
        // branch information is irrelevant when nothing exists
        assert_eq!(
            SyncAction::decide(false, Some("sequoia"), "sequoia"),
            SyncAction::Clone
        );
        assert_eq!(
            SyncAction::decide(true, Some("sonoma"), "sequoia"),
            SyncAction::Switch {
                from: Some("sonoma".into())
            }
        );
        assert_eq!(SyncAction::decide(true, Some("sequoia"), "sequoia"), SyncAction::Pull);
        assert_eq!(
            SyncAction::decide(true, None, "sequoia"),
            SyncAction::Switch { from: None }
        );
        assert_eq!(
            SyncAction::decide(true, Some("unknown"), "sequoia"),
            SyncAction::Switch {
                from: Some("unknown".into())
            }
        );
    }

    #[tokio::test]
    async fn test_clone_when_path_missing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("macos_security");
        let runner = Arc::new(ScriptedRunner::new().reply(0, "", "Cloning into 'macos_security'...\n"));
        let controller = controller(&runner);
        let mut rx = controller.subscribe();

        let outcome = controller.sync(&SyncRequest::new(&target, "sequoia")).await;

        assert_eq!(outcome.action, SyncAction::Clone);
        assert!(outcome.succeeded);
        assert!(outcome.failure.is_none());
        assert!(outcome.combined_log.contains("Cloning into 'macos_security'..."));
        assert!(outcome.combined_log.ends_with("Ready: mSCP (sequoia)"));

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec![
                "clone".to_string(),
                "--depth".into(),
                "1".into(),
                "-b".into(),
                "sequoia".into(),
                crate::config::DEFAULT_REMOTE.into(),
                target.to_string_lossy().into_owned(),
            ]
        );
        assert_eq!(calls[0].timeout, Duration::from_secs(120));

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), outcome.token);
        assert_ne!(outcome.token, SyncToken::INITIAL);
    }

    #[tokio::test]
    async fn test_switch_checkout_failure_stops_without_pull() {
        let dir = TempDir::new().unwrap();
        make_clone(dir.path());
        let runner = Arc::new(
            ScriptedRunner::new()
                .reply(0, "sonoma\n", "")
                .reply(0, &toplevel(dir.path()), "")
                .reply(0, "", "")
                .reply(0, "", "From github.com:usnistgov/macos_security\n * branch sequoia -> FETCH_HEAD\n")
                .reply(1, "", "error: pathspec 'sequoia' did not match any file(s) known to git\n"),
        );
        let controller = controller(&runner);

        let outcome = controller
            .sync(&SyncRequest::new(dir.path(), "sequoia"))
            .await;

        assert_eq!(
            outcome.action,
            SyncAction::Switch {
                from: Some("sonoma".into())
            }
        );
        assert!(!outcome.succeeded);
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.kind, ErrorKind::ExternalFailure);

        let fetch_at = outcome.combined_log.find("FETCH_HEAD").unwrap();
        let checkout_at = outcome.combined_log.find("error: pathspec").unwrap();
        assert!(fetch_at < checkout_at);

        assert_eq!(
            runner.command_lines(),
            vec![
                "git rev-parse --abbrev-ref HEAD",
                "git rev-parse --show-toplevel",
                "git remote set-branches --add origin sequoia",
                "git fetch --depth 1 origin sequoia",
                "git checkout sequoia",
            ]
        );
        assert!(!runner.command_lines().iter().any(|c| c.contains("pull")));
    }

    #[tokio::test]
    async fn test_switch_fetch_timeout_skips_checkout() {
        let dir = TempDir::new().unwrap();
        make_clone(dir.path());
        let runner = Arc::new(
            ScriptedRunner::new()
                .reply(0, "sonoma\n", "")
                .reply(0, &toplevel(dir.path()), "")
                .reply(0, "", "")
                .fail(Error::Timeout {
                    command: "git fetch --depth 1 origin tahoe".into(),
                    timeout: Duration::from_secs(60),
                    output: "remote: Enumerating objects: 42\n".into(),
                }),
        );
        let controller = controller(&runner);

        let outcome = controller.sync(&SyncRequest::new(dir.path(), "tahoe")).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure.unwrap().kind, ErrorKind::Timeout);
        assert!(outcome.combined_log.contains("Enumerating objects"));
        assert_eq!(runner.calls().len(), 4);
        assert_eq!(runner.calls()[3].timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_pull_refuses_non_fast_forward() {
        let dir = TempDir::new().unwrap();
        make_clone(dir.path());
        let runner = Arc::new(
            ScriptedRunner::new()
                .reply(0, "sequoia\n", "")
                .reply(0, &toplevel(dir.path()), "")
                .reply(128, "", "fatal: Not possible to fast-forward, aborting.\n"),
        );
        let controller = controller(&runner);

        let outcome = controller
            .sync(&SyncRequest::new(dir.path(), "sequoia"))
            .await;

        assert_eq!(outcome.action, SyncAction::Pull);
        assert!(!outcome.succeeded);
        assert!(outcome.combined_log.contains("Not possible to fast-forward"));
        assert!(!outcome.combined_log.contains("up to date"));
        assert_eq!(
            runner.command_lines(),
            vec![
                "git rev-parse --abbrev-ref HEAD",
                "git rev-parse --show-toplevel",
                "git pull --ff-only"
            ]
        );
        assert!(!runner
            .calls()
            .iter()
            .any(|c| c.args.iter().any(|a| a == "--force" || a == "--rebase")));
    }

    #[tokio::test]
    async fn test_token_changes_on_consecutive_failures() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing");
        let runner = Arc::new(
            ScriptedRunner::new()
                .reply(128, "", "fatal: Remote branch nope not found in upstream origin\n")
                .reply(128, "", "fatal: Remote branch nope not found in upstream origin\n"),
        );
        let controller = controller(&runner);
        let mut rx = controller.subscribe();

        let first = controller.sync(&SyncRequest::new(&target, "nope")).await;
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        let second = controller.sync(&SyncRequest::new(&target, "nope")).await;
        assert!(rx.has_changed().unwrap());

        assert!(!first.succeeded);
        assert!(!second.succeeded);
        assert_ne!(first.token, second.token);
        assert_eq!(controller.last_token(), second.token);
    }

    #[tokio::test]
    async fn test_empty_directory_is_cloned_into() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("project/macos_security");
        fs::create_dir_all(&target).unwrap();
        let runner = Arc::new(ScriptedRunner::new().reply(0, "", ""));
        let controller = controller(&runner);

        let outcome = controller.sync(&SyncRequest::new(&target, "sequoia")).await;

        assert_eq!(outcome.action, SyncAction::Clone);
        assert!(outcome.succeeded);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args[0], "clone");
        assert_eq!(
            calls[0].args.last().unwrap(),
            &target.to_string_lossy().into_owned()
        );
    }

    #[tokio::test]
    async fn test_refuses_to_switch_enclosing_repository() {
        let outer = TempDir::new().unwrap();
        let target = outer.path().join("project/macos_security");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("notes.txt"), "not mSCP").unwrap();
        // git resolves the work tree of the surrounding checkout
        let runner = Arc::new(ScriptedRunner::new().reply(0, &toplevel(outer.path()), ""));
        let controller = controller(&runner);
        let mut rx = controller.subscribe();

        let outcome = controller.sync(&SyncRequest::new(&target, "sequoia")).await;

        assert_eq!(outcome.action, SyncAction::Switch { from: None });
        assert!(!outcome.succeeded);
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.kind, ErrorKind::PreconditionUnmet);
        assert!(outcome.combined_log.contains("inside the repository"));
        assert_eq!(runner.command_lines(), vec!["git rev-parse --show-toplevel"]);
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_refuses_to_pull_from_subdirectory_of_other_repository() {
        let outer = TempDir::new().unwrap();
        let target = outer.path().join("vendor/macos_security");
        make_clone(&target);
        let runner = Arc::new(
            ScriptedRunner::new()
                .reply(0, "sequoia\n", "")
                .reply(0, &toplevel(outer.path()), ""),
        );
        let controller = controller(&runner);

        let outcome = controller.sync(&SyncRequest::new(&target, "sequoia")).await;

        assert_eq!(outcome.action, SyncAction::Pull);
        assert_eq!(outcome.failure.unwrap().kind, ErrorKind::PreconditionUnmet);
        assert!(!runner.command_lines().iter().any(|c| c.contains("pull")));
    }

    #[test]
    fn test_invalid_remote_rejected() {
        let runner = Arc::new(ScriptedRunner::new());
        let mut config = Config::default();
        config.repository.remote = "not a remote".into();
        let err = SyncController::new(runner, &config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
