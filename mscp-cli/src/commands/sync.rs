//! Sync command - clone, switch or update the local clone

use clap::Args;
use mscp_core::{Config, Session, SyncOutcome};

/// Bring the local clone onto a platform branch
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Branch to sync (defaults to the configured or newest macOS branch)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Show what would happen without running git
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let mut session = Session::new(config)?;
        let branch = resolve_branch(&mut session, self.branch.as_deref()).await?;

        let action = session.plan_sync(&branch).await;
        if verbose {
            tracing::info!(action = %action, branch = %branch, "Planned sync");
        }

        if self.dry_run {
            println!(
                "[Dry run] Would {} {} at {}",
                action,
                branch,
                session.repo_path().display()
            );
            return Ok(());
        }

        let outcome = session.sync(&branch).await;
        report(&outcome)
    }
}

/// Explicit branch, else the session's preselection
pub async fn resolve_branch(session: &mut Session, branch: Option<&str>) -> anyhow::Result<String> {
    session
        .resolve_branch(branch)
        .await
        .ok_or_else(|| anyhow::anyhow!("No branch available to sync"))
}

/// Print the sync log; a failed sync is an error
pub fn report(outcome: &SyncOutcome) -> anyhow::Result<()> {
    println!("{}", outcome.combined_log);
    match outcome.failure {
        Some(ref failure) => anyhow::bail!("Sync ({}) failed: {}", outcome.action, failure.message),
        None => Ok(()),
    }
}
