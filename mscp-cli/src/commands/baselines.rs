//! Baselines command - list baselines in the local clone

use clap::Args;
use mscp_core::{Config, Session};

use super::{print_selections, print_source_notice};

/// List baselines of the checked-out branch
#[derive(Args, Debug)]
pub struct BaselinesArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl BaselinesArgs {
    /// Execute the baselines command
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut session = Session::new(config)?;
        let listing = session.baselines();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&listing)?);
            return Ok(());
        }

        print_source_notice("baselines in the local clone", listing.source);
        print_selections(&listing.baselines, listing.default_stem());
        Ok(())
    }
}
