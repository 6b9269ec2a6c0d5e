//! Invoking the mSCP baseline generator

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{Config, GeneratorConfig};
use crate::process::{CommandRunner, CommandSpec};
use crate::{Error, Result};

/// Artifact types the generator can emit, in command-line order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Configuration profiles (.mobileconfig)
    Profiles,
    /// Compliance check/remediation scripts
    Scripts,
    /// Declarative Device Management artifacts
    Ddm,
    /// SCAP/XCCDF tags
    ScapTags,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Profiles,
        ArtifactKind::Scripts,
        ArtifactKind::Ddm,
        ArtifactKind::ScapTags,
    ];

    /// Generator flag for this artifact
    pub fn flag(self) -> &'static str {
        match self {
            ArtifactKind::Profiles => "-p",
            ArtifactKind::Scripts => "-s",
            ArtifactKind::Ddm => "-D",
            ArtifactKind::ScapTags => "-g",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ArtifactKind::Profiles => "configuration profiles",
            ArtifactKind::Scripts => "compliance scripts",
            ArtifactKind::Ddm => "DDM artifacts",
            ArtifactKind::ScapTags => "SCAP/XCCDF tags",
        }
    }
}

/// One generation run, built fresh per invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub flags: BTreeSet<ArtifactKind>,
    /// Baseline file stem (e.g. `800-53r5_low`)
    pub baseline: String,
    pub repo_path: PathBuf,
}

impl GenerationRequest {
    pub fn new(
        repo_path: impl Into<PathBuf>,
        baseline: impl Into<String>,
        flags: impl IntoIterator<Item = ArtifactKind>,
    ) -> Self {
        Self {
            flags: flags.into_iter().collect(),
            baseline: baseline.into(),
            repo_path: repo_path.into(),
        }
    }

    /// Flags in fixed generator order
    pub fn flag_args(&self) -> Vec<&'static str> {
        self.flags.iter().map(|k| k.flag()).collect()
    }
}

/// What the generator did
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub combined_log: String,
    /// Process exit code, -1 when terminated by a signal
    pub exit_code: i32,
    /// Where the generator writes; not checked until inspected
    pub output_dir: PathBuf,
}

impl GenerationResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Builds and runs the generator command
#[derive(Clone)]
pub struct GenerationInvoker {
    runner: Arc<dyn CommandRunner>,
    generator: GeneratorConfig,
    timeout: Duration,
}

impl std::fmt::Debug for GenerationInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationInvoker")
            .field("generator", &self.generator)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GenerationInvoker {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config) -> Self {
        Self {
            runner,
            generator: config.generator.clone(),
            timeout: config.timeouts.generate,
        }
    }

    /// Check preconditions in order, stopping at the first unmet one
    ///
    /// 1. repository path exists
    /// 2. generator script exists
    /// 3. at least one artifact selected
    /// 4. baseline file exists
    pub fn validate(&self, request: &GenerationRequest) -> Result<()> {
        let repo = &request.repo_path;
        if !repo.exists() {
            return Err(Error::NotFound(format!(
                "mSCP repository not found at {}. Sync it first.",
                repo.display()
            )));
        }

        let script = self.generator.script_path(repo);
        if !script.is_file() {
            return Err(Error::NotFound(format!(
                "{} not found. Is {} a valid mSCP repository?",
                self.generator.script,
                repo.display()
            )));
        }

        if request.flags.is_empty() {
            return Err(Error::PreconditionUnmet(
                "Select at least one output type (profiles, scripts, DDM or SCAP tags)".to_string(),
            ));
        }

        let baseline_file = self.generator.baseline_file(&request.baseline);
        if !repo.join(&baseline_file).is_file() {
            return Err(Error::NotFound(format!(
                "Baseline file not found: {}",
                baseline_file.display()
            )));
        }

        Ok(())
    }

    /// The exact command [`generate`](Self::generate) would run
    pub fn command(&self, request: &GenerationRequest) -> CommandSpec {
        CommandSpec::new(self.generator.runner.as_str())
            .args(["run", "--with-requirements"])
            .arg(self.generator.requirements.as_str())
            .args(["python", self.generator.script.as_str()])
            .args(request.flag_args())
            .arg(
                self.generator
                    .baseline_file(&request.baseline)
                    .to_string_lossy()
                    .into_owned(),
            )
            .current_dir(&request.repo_path)
            .env("PYTHONUNBUFFERED", "1")
            .timeout(self.timeout)
    }

    /// Shell-style rendering of the command, for display before running
    pub fn command_preview(&self, request: &GenerationRequest) -> String {
        let spec = self.command(request);
        format!(
            "cd {}\n{} {} \\\n    {}",
            request.repo_path.display(),
            spec.program,
            spec.args[..3].join(" "),
            spec.args[3..].join(" ")
        )
    }

    pub fn output_dir(&self, repo: &Path, baseline: &str) -> PathBuf {
        self.generator.output_dir(repo, baseline)
    }

    /// Run the generator after checking preconditions
    ///
    /// A non-zero exit is reported in the result; errors are reserved for
    /// unmet preconditions, a missing runner and timeouts.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.validate(request)?;

        let spec = self.command(request);
        tracing::info!(
            baseline = %request.baseline,
            flags = ?request.flag_args(),
            "Running baseline generator"
        );

        let output = self.runner.run(&spec).await.map_err(|e| match e {
            Error::NotFound(_) => Error::NotFound(format!(
                "{} not found. Install with: curl -LsSf https://astral.sh/uv/install.sh | sh",
                self.generator.runner
            )),
            other => other,
        })?;

        let output_dir = self.output_dir(&request.repo_path, &request.baseline);
        let mut combined_log = output.combined();
        let exit_code = output.code.unwrap_or(-1);
        if output.success() {
            combined_log.push_str(&format!(
                "\n\nGeneration complete! Output in: {}/",
                output_dir.display()
            ));
        } else {
            tracing::warn!(baseline = %request.baseline, exit_code, "Generator failed");
            combined_log.push_str(&format!(
                "\n\nGeneration failed with exit code {}",
                exit_code
            ));
        }

        Ok(GenerationResult {
            combined_log,
            exit_code,
            output_dir,
        })
    }
}
