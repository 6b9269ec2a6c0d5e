//! Generate command - run the mSCP baseline generator

use clap::Args;
use mscp_core::{Config, GenerationRequest, Session};

use super::outputs::print_summary;
use super::{print_source_notice, ArtifactFlags};

/// Generate artifacts for a baseline
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Baseline stem, e.g. 800-53r5_low (defaults to the first baseline)
    #[arg(short, long)]
    pub baseline: Option<String>,

    #[command(flatten)]
    pub artifacts: ArtifactFlags,

    /// Print the command without running it
    #[arg(long)]
    pub dry_run: bool,
}

impl GenerateArgs {
    /// Execute the generate command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let mut session = Session::new(config)?;
        let baseline = match self.baseline {
            Some(ref b) => b.clone(),
            None => {
                let listing = session.baselines();
                print_source_notice("baselines in the local clone", listing.source);
                listing
                    .default_stem()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("No baseline selected"))?
            }
        };

        let request = session.generation_request(&baseline, self.artifacts.selected());
        if verbose {
            tracing::info!(baseline = %baseline, flags = ?request.flag_args(), "Generation request");
        }

        if self.dry_run {
            session.generator().validate(&request)?;
            println!("{}", session.generator().command_preview(&request));
            return Ok(());
        }

        run_generation(&session, &request).await
    }
}

/// Show the command, run it and summarise the output
pub async fn run_generation(session: &Session, request: &GenerationRequest) -> anyhow::Result<()> {
    // validate first so the preview is only shown for runnable requests
    session.generator().validate(request)?;
    println!("{}", session.generator().command_preview(request));
    println!();

    let result = session.generate(request).await?;
    println!("{}", result.combined_log);
    if !result.succeeded() {
        anyhow::bail!("Generator exited with code {}", result.exit_code);
    }

    println!();
    print_summary(&session.artifacts(&request.baseline)?);
    Ok(())
}
