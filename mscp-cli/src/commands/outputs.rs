//! Outputs command - inspect what the generator produced

use clap::Args;
use mscp_core::{Config, OutputStatus, Session};

/// Summarise, list or open generated artifacts
#[derive(Args, Debug)]
pub struct OutputsArgs {
    /// Baseline stem (defaults to the first baseline in the clone)
    #[arg(short, long)]
    pub baseline: Option<String>,

    /// List every generated file
    #[arg(long)]
    pub list: bool,

    /// Open the output folder in the file browser
    #[arg(long)]
    pub open: bool,
}

impl OutputsArgs {
    /// Execute the outputs command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut session = Session::new(config)?;
        let baseline = match self.baseline {
            Some(ref b) => b.clone(),
            None => session
                .baselines()
                .default_stem()
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("No baseline selected"))?,
        };

        print_summary(&session.artifacts(&baseline)?);

        if self.list {
            let files = session
                .inspector()
                .list_files(session.repo_path(), &baseline)?;
            if let Some(files) = files {
                println!();
                for file in files {
                    println!("  {}", file.display());
                }
            }
        }

        if self.open {
            session
                .inspector()
                .open_folder(session.repo_path(), &baseline)
                .await?;
        }

        Ok(())
    }
}

/// Human summary of a baseline's output directory
pub fn print_summary(status: &OutputStatus) {
    match status {
        OutputStatus::NotGenerated { dir } => {
            println!("No output yet. Expected at: {}", dir.display());
        }
        OutputStatus::Generated(summary) => {
            println!("Output: {}", summary.dir.display());
            println!("  Profiles: {}", summary.profile_count);
            if summary.compliance_scripts.is_empty() {
                println!("  Compliance script: none");
            } else {
                for script in &summary.compliance_scripts {
                    let name = script
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    println!("  Compliance script: {}", name);
                }
            }
            println!("  DDM: {}", if summary.has_ddm { "yes" } else { "no" });
        }
    }
}
