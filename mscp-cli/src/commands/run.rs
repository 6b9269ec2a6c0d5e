//! Run command - sync, pick a baseline and generate in one go

use clap::Args;
use mscp_core::{Config, Session};

use super::generate::run_generation;
use super::sync::{report, resolve_branch};
use super::{print_source_notice, ArtifactFlags};

/// Full flow: sync the branch, refresh baselines, generate
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Branch to sync (defaults to the configured or newest macOS branch)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Baseline stem (defaults to the first baseline on the branch)
    #[arg(long)]
    pub baseline: Option<String>,

    #[command(flatten)]
    pub artifacts: ArtifactFlags,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let mut session = Session::new(config)?;

        if self.branch.is_none() {
            let branches = session.branches().await;
            print_source_notice("branches on the remote", branches.source);
        }
        let branch = resolve_branch(&mut session, self.branch.as_deref()).await?;

        println!("== Sync ({}) ==", branch);
        let outcome = session.sync(&branch).await;
        report(&outcome)?;
        println!();

        // rescanned: the sync published a new token
        let listing = session.baselines();
        print_source_notice("baselines in the local clone", listing.source);
        let baseline = match self.baseline {
            Some(ref b) if listing.contains(b) => b.clone(),
            Some(ref b) => anyhow::bail!(
                "Baseline {} not found on {}. Available: {}",
                b,
                branch,
                listing.baselines.values().collect::<Vec<_>>().join(", ")
            ),
            None => listing
                .default_stem()
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("No baseline available on {}", branch))?,
        };

        if verbose {
            tracing::info!(branch = %branch, baseline = %baseline, "Generating");
        }

        println!("== Generate ({}) ==", baseline);
        let request = session.generation_request(&baseline, self.artifacts.selected());
        run_generation(&session, &request).await
    }
}
