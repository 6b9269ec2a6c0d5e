//! Status command - show the state of the local clone

use clap::Args;
use mscp_core::{Config, Session};

/// Show where the clone is and what is checked out
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut session = Session::new(config)?;
        let state = session.repository_state().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&state)?);
            return Ok(());
        }

        println!("Repository: {}", state.path.display());
        if !state.exists {
            println!("  Not cloned yet. Run `mscp sync` to clone it.");
        } else if !state.is_valid_clone {
            println!("  Exists but does not look like mSCP (no generator script).");
        } else {
            println!(
                "  Branch: {}",
                state.current_branch.as_deref().unwrap_or("unknown")
            );
        }
        Ok(())
    }
}
