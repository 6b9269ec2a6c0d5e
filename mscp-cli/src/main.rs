//! mSCP CLI - Command line front-end for the macOS Security Compliance Project
//!
//! Clone or update mSCP, pick a platform branch and baseline, and generate
//! configuration profiles and compliance scripts.

mod commands;

use clap::{Parser, Subcommand};
use mscp_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{
    BaselinesArgs, BranchesArgs, DoctorArgs, GenerateArgs, OutputsArgs, RunArgs, StatusArgs,
    SyncArgs,
};

/// mSCP: generate macOS security baselines from the NIST compliance project
#[derive(Parser, Debug)]
#[command(name = "mscp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Local clone of mSCP (overrides config and env)
    #[arg(long, global = true, env = "MSCP_REPO_PATH")]
    repo_path: Option<String>,

    /// Remote to clone from, URL or owner/repo (overrides config and env)
    #[arg(long, global = true, env = "MSCP_REMOTE")]
    remote: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Show current configuration
    Config,

    /// Show the state of the local clone
    #[command(visible_alias = "st")]
    Status(StatusArgs),

    /// List platform branches on the remote
    Branches(BranchesArgs),

    /// List baselines in the local clone
    Baselines(BaselinesArgs),

    /// Clone, switch or update the local clone
    Sync(SyncArgs),

    /// Run the baseline generator
    #[command(visible_alias = "gen")]
    Generate(GenerateArgs),

    /// Inspect generated artifacts
    Outputs(OutputsArgs),

    /// Check that required tools are installed
    Doctor(DoctorArgs),

    /// Sync, pick a baseline and generate in one go
    #[command(visible_alias = "r")]
    Run(RunArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays pipeable
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.repo_path.clone(), cli.remote.clone())?;

    if cli.verbose {
        tracing::info!(
            repo_path = %config.repository.path,
            remote = %config.repository.remote,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("mscp {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Config) => print_config(&config),
        Some(Commands::Status(args)) => args.execute(&config).await?,
        Some(Commands::Branches(args)) => args.execute(&config).await?,
        Some(Commands::Baselines(args)) => args.execute(&config)?,
        Some(Commands::Sync(args)) => args.execute(cli.verbose, &config).await?,
        Some(Commands::Generate(args)) => args.execute(cli.verbose, &config).await?,
        Some(Commands::Outputs(args)) => args.execute(&config).await?,
        Some(Commands::Doctor(args)) => args.execute(&config).await?,
        Some(Commands::Run(args)) => args.execute(cli.verbose, &config).await?,
        None => {
            println!("mscp - macOS Security Compliance Project front-end");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config) {
    println!("mSCP Configuration");
    println!("==================");
    println!();
    println!("Repository:");
    println!("  path: {}", config.repository.path);
    match mscp_core::RemoteUrl::parse(&config.repository.remote) {
        Ok(remote) => println!("  remote: {} ({})", remote, remote.summary()),
        Err(e) => println!("  remote: {} ({})", config.repository.remote, e),
    }
    println!(
        "  default_branch: {}",
        config.repository.default_branch.as_deref().unwrap_or("(newest macOS)")
    );
    println!();
    println!("Generator:");
    println!("  runner: {}", config.generator.runner);
    println!("  script: {}", config.generator.script);
    println!("  requirements: {}", config.generator.requirements);
    println!("  baselines_dir: {}", config.generator.baselines_dir);
    println!("  build_dir: {}", config.generator.build_dir);
    println!();
    println!("Timeouts:");
    println!("  clone: {:?}", config.timeouts.clone);
    println!("  fetch: {:?}", config.timeouts.fetch);
    println!("  pull: {:?}", config.timeouts.pull);
    println!("  generate: {:?}", config.timeouts.generate);
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_flags_parse() {
        let cli = Cli::try_parse_from([
            "mscp",
            "generate",
            "--baseline",
            "cis_lvl1",
            "--no-scripts",
            "--ddm",
            "--dry-run",
        ])
        .unwrap();
        let Some(Commands::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.baseline.as_deref(), Some("cis_lvl1"));
        assert!(args.dry_run);
        assert_eq!(
            args.artifacts.selected(),
            vec![mscp_core::ArtifactKind::Profiles, mscp_core::ArtifactKind::Ddm]
        );
    }
}
