//! Branches command - list platform branches on the remote

use clap::Args;
use mscp_core::{Config, Session};

use super::{print_selections, print_source_notice};

/// List platform branches
#[derive(Args, Debug)]
pub struct BranchesArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl BranchesArgs {
    /// Execute the branches command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut session = Session::new(config)?;
        let listing = session.branches().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&listing)?);
            return Ok(());
        }

        print_source_notice("branches on the remote", listing.source);
        let default = session.default_branch().await;
        print_selections(&listing.branches, default.as_deref());
        Ok(())
    }
}
