//! One user session: the components plus the views derived from the clone
//!
//! Views of the local clone (its [`RepositoryState`] and the baseline
//! listing) are cached until the [`SyncController`] publishes a new
//! [`SyncToken`], then recomputed on next access. The branch listing comes
//! from the remote and is fetched once unless explicitly refreshed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;

use crate::catalog::{BaselineCatalog, BaselineListing, BranchCatalog, BranchListing};
use crate::config::Config;
use crate::generate::{ArtifactKind, GenerationInvoker, GenerationRequest, GenerationResult};
use crate::git::{
    expand_path, RepoLocator, RepositoryState, SyncAction, SyncController, SyncOutcome,
    SyncRequest, SyncToken,
};
use crate::outputs::{OutputInspector, OutputStatus};
use crate::process::{CommandRunner, SystemRunner};
use crate::Result;

/// A value derived from the clone, invalidated by every sync
#[derive(Debug)]
struct Dependent<T> {
    completed: watch::Receiver<SyncToken>,
    value: Option<T>,
}

impl<T> Dependent<T> {
    fn new(completed: watch::Receiver<SyncToken>) -> Self {
        Self {
            completed,
            value: None,
        }
    }

    /// Cached value, unless a sync finished since it was stored
    fn fresh(&self) -> Option<&T> {
        if self.completed.has_changed().unwrap_or(false) {
            None
        } else {
            self.value.as_ref()
        }
    }

    fn store(&mut self, value: T) {
        // mark the current token as seen
        let _ = self.completed.borrow_and_update();
        self.value = Some(value);
    }
}

/// Components and selection state for one interactive session
#[derive(Debug)]
pub struct Session {
    repo_path: PathBuf,
    preferred_branch: Option<String>,
    locator: RepoLocator,
    branch_catalog: BranchCatalog,
    baseline_catalog: BaselineCatalog,
    controller: SyncController,
    generator: GenerationInvoker,
    inspector: OutputInspector,
    repo_state: Dependent<RepositoryState>,
    baselines: Dependent<BaselineListing>,
    branches: Option<BranchListing>,
}

impl Session {
    /// Session running real subprocesses
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_runner(Arc::new(SystemRunner::new()), config)
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>, config: &Config) -> Result<Self> {
        let controller = SyncController::new(runner.clone(), config)?;
        let repo_state = Dependent::new(controller.subscribe());
        let baselines = Dependent::new(controller.subscribe());

        Ok(Self {
            repo_path: expand_path(&config.repository.path),
            preferred_branch: config.repository.default_branch.clone(),
            locator: RepoLocator::new(runner.clone(), config),
            branch_catalog: BranchCatalog::new(runner.clone(), config)?,
            baseline_catalog: BaselineCatalog::new(config),
            generator: GenerationInvoker::new(runner.clone(), config),
            inspector: OutputInspector::new(runner, config),
            controller,
            repo_state,
            baselines,
            branches: None,
        })
    }

    /// Resolved location of the clone
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Token of the most recent sync
    pub fn last_sync(&self) -> SyncToken {
        self.controller.last_token()
    }

    pub async fn repository_state(&mut self) -> RepositoryState {
        if let Some(state) = self.repo_state.fresh() {
            return state.clone();
        }

        let state = self.locator.inspect(&self.repo_path).await;
        self.repo_state.store(state.clone());
        state
    }

    /// Baselines of the branch currently on disk
    pub fn baselines(&mut self) -> BaselineListing {
        if let Some(listing) = self.baselines.fresh() {
            return listing.clone();
        }

        tracing::debug!(path = %self.repo_path.display(), "Rescanning baselines");
        let listing = self.baseline_catalog.scan_baselines(&self.repo_path);
        self.baselines.store(listing.clone());
        listing
    }

    /// Remote branches, fetched on first use
    pub async fn branches(&mut self) -> BranchListing {
        match self.branches {
            Some(ref listing) => listing.clone(),
            None => self.refresh_branches().await,
        }
    }

    /// Re-query the remote for branches
    pub async fn refresh_branches(&mut self) -> BranchListing {
        let listing = self.branch_catalog.load().await;
        self.branches = Some(listing.clone());
        listing
    }

    /// Branch to preselect: the configured one if listed, else the catalog default
    pub async fn default_branch(&mut self) -> Option<String> {
        let preferred = self.preferred_branch.clone();
        self.branches()
            .await
            .select(preferred.as_deref())
            .map(|s| s.value.clone())
    }

    /// Branch to sync: `explicit` as given, else the preselection
    ///
    /// The remote is only queried when no branch is given.
    pub async fn resolve_branch(&mut self, explicit: Option<&str>) -> Option<String> {
        match explicit {
            Some(branch) => Some(branch.to_string()),
            None => self.default_branch().await,
        }
    }

    /// What syncing to `branch` would do right now
    pub async fn plan_sync(&self, branch: &str) -> SyncAction {
        self.controller
            .plan(&SyncRequest::new(&self.repo_path, branch))
            .await
    }

    /// Bring the clone onto `branch`; invalidates clone-derived views
    pub async fn sync(&mut self, branch: &str) -> SyncOutcome {
        self.controller
            .sync(&SyncRequest::new(&self.repo_path, branch))
            .await
    }

    /// Build a request against this session's clone
    pub fn generation_request(
        &self,
        baseline: &str,
        flags: impl IntoIterator<Item = ArtifactKind>,
    ) -> GenerationRequest {
        GenerationRequest::new(&self.repo_path, baseline, flags)
    }

    pub fn generator(&self) -> &GenerationInvoker {
        &self.generator
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.generator.generate(request).await
    }

    pub fn inspector(&self) -> &OutputInspector {
        &self.inspector
    }

    pub fn artifacts(&self, baseline: &str) -> Result<OutputStatus> {
        self.inspector.list_artifacts(&self.repo_path, baseline)
    }
}
