//! Doctor command - check prerequisites and the local clone

use clap::Args;
use mscp_core::doctor::check_prerequisites;
use mscp_core::{Config, Session};

/// Check that git and the package runner are installed
#[derive(Args, Debug)]
pub struct DoctorArgs {}

impl DoctorArgs {
    /// Execute the doctor command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let checks = check_prerequisites(config);
        let mut missing = 0;

        println!("Prerequisites:");
        for check in &checks {
            match check.path {
                Some(ref path) => println!("  [ok]      {} ({})", check.name, path.display()),
                None => {
                    missing += 1;
                    println!("  [missing] {}", check.name);
                    println!("            {}", check.hint);
                }
            }
        }

        let mut session = Session::new(config)?;
        let state = session.repository_state().await;
        println!();
        println!("Repository: {}", state.path.display());
        println!(
            "  exists: {}, valid clone: {}, branch: {}",
            state.exists,
            state.is_valid_clone,
            state.current_branch.as_deref().unwrap_or("-")
        );

        if missing > 0 {
            anyhow::bail!("{} prerequisite(s) missing", missing);
        }
        Ok(())
    }
}
