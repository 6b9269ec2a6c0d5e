//! Inspecting generated artifacts

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use walkdir::WalkDir;

use crate::config::{Config, GeneratorConfig};
use crate::process::{CommandRunner, CommandSpec};
use crate::{Error, Result};

/// Counts of what the generator produced for one baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub dir: PathBuf,
    /// `.mobileconfig` files anywhere below `dir`
    pub profile_count: usize,
    /// `*_compliance.sh` scripts directly in `dir`
    pub compliance_scripts: Vec<PathBuf>,
    /// Whether a `ddm/` directory exists
    pub has_ddm: bool,
}

/// Output state for a baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutputStatus {
    /// Nothing generated yet
    NotGenerated { dir: PathBuf },
    Generated(ArtifactSummary),
}

/// Read-only view of the generator's build directory
pub struct OutputInspector {
    runner: Arc<dyn CommandRunner>,
    generator: GeneratorConfig,
}

impl std::fmt::Debug for OutputInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputInspector")
            .field("build_dir", &self.generator.build_dir)
            .finish_non_exhaustive()
    }
}

impl OutputInspector {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config) -> Self {
        Self {
            runner,
            generator: config.generator.clone(),
        }
    }

    pub fn output_dir(&self, repo_path: &Path, baseline: &str) -> PathBuf {
        self.generator.output_dir(repo_path, baseline)
    }

    /// Summarise artifacts for a baseline
    pub fn list_artifacts(&self, repo_path: &Path, baseline: &str) -> Result<OutputStatus> {
        let dir = self.output_dir(repo_path, baseline);
        if !dir.is_dir() {
            return Ok(OutputStatus::NotGenerated { dir });
        }

        let mut profile_count = 0;
        for entry in WalkDir::new(&dir) {
            let entry = entry.map_err(|e| Error::Other(format!("Failed to walk {}: {}", dir.display(), e)))?;
            let is_profile = entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "mobileconfig");
            if is_profile {
                profile_count += 1;
            }
        }

        let mut compliance_scripts = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_script = path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with("_compliance.sh"));
            if is_script {
                compliance_scripts.push(path);
            }
        }
        compliance_scripts.sort();

        Ok(OutputStatus::Generated(ArtifactSummary {
            has_ddm: dir.join("ddm").is_dir(),
            dir,
            profile_count,
            compliance_scripts,
        }))
    }

    /// Every file below the output directory, relative and sorted
    ///
    /// Returns `None` when nothing has been generated yet.
    pub fn list_files(&self, repo_path: &Path, baseline: &str) -> Result<Option<Vec<PathBuf>>> {
        let dir = self.output_dir(repo_path, baseline);
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir) {
            let entry = entry.map_err(|e| Error::Other(format!("Failed to walk {}: {}", dir.display(), e)))?;
            if entry.file_type().is_file() {
                if let Ok(relative) = entry.path().strip_prefix(&dir) {
                    files.push(relative.to_path_buf());
                }
            }
        }
        files.sort();
        Ok(Some(files))
    }

    /// Open the output directory in the platform file browser
    pub async fn open_folder(&self, repo_path: &Path, baseline: &str) -> Result<()> {
        let dir = self.output_dir(repo_path, baseline);
        if !dir.is_dir() {
            return Err(Error::NotFound(format!(
                "Output directory not found: {}",
                dir.display()
            )));
        }

        let spec = CommandSpec::new(opener())
            .arg(dir.to_string_lossy().into_owned())
            .timeout(Duration::from_secs(10));
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(Error::ExternalFailure {
                command: spec.to_string(),
                code: output.code,
                output: output.combined(),
            });
        }
        Ok(())
    }
}

fn opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::ScriptedRunner;
    use std::fs;
    use tempfile::TempDir;

    fn inspector(runner: &Arc<ScriptedRunner>) -> OutputInspector {
        OutputInspector::new(runner.clone(), &Config::default())
    }

    fn populate(repo: &Path) -> PathBuf {
        let out = repo.join("build/cis_lvl1");
        fs::create_dir_all(out.join("mobileconfigs/unsigned")).unwrap();
        fs::create_dir_all(out.join("ddm/activations")).unwrap();
        fs::write(out.join("mobileconfigs/unsigned/com.apple.a.mobileconfig"), "").unwrap();
        fs::write(out.join("mobileconfigs/unsigned/com.apple.b.mobileconfig"), "").unwrap();
        fs::write(out.join("cis_lvl1_compliance.sh"), "#!/bin/zsh").unwrap();
        fs::write(out.join("cis_lvl1.adoc"), "").unwrap();
        out
    }

    #[test]
    fn test_no_output_yet() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let status = inspector(&runner).list_artifacts(dir.path(), "cis_lvl1").unwrap();
        assert_eq!(
            status,
            OutputStatus::NotGenerated {
                dir: dir.path().join("build/cis_lvl1")
            }
        );
        assert!(inspector(&runner)
            .list_files(dir.path(), "cis_lvl1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_summary_counts() {
        let dir = TempDir::new().unwrap();
        let out = populate(dir.path());
        let runner = Arc::new(ScriptedRunner::new());

        let status = inspector(&runner).list_artifacts(dir.path(), "cis_lvl1").unwrap();
        let OutputStatus::Generated(summary) = status else {
            panic!("expected generated output");
        };
        assert_eq!(summary.dir, out);
        assert_eq!(summary.profile_count, 2);
        assert_eq!(summary.compliance_scripts, vec![out.join("cis_lvl1_compliance.sh")]);
        assert!(summary.has_ddm);
    }

    #[test]
    fn test_list_files_relative_sorted() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());
        let runner = Arc::new(ScriptedRunner::new());

        let files = inspector(&runner)
            .list_files(dir.path(), "cis_lvl1")
            .unwrap()
            .unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("cis_lvl1.adoc"),
                PathBuf::from("cis_lvl1_compliance.sh"),
                PathBuf::from("mobileconfigs/unsigned/com.apple.a.mobileconfig"),
                PathBuf::from("mobileconfigs/unsigned/com.apple.b.mobileconfig"),
            ]
        );
    }

    #[tokio::test]
    async fn test_open_folder() {
        let dir = TempDir::new().unwrap();
        let out = populate(dir.path());
        let runner = Arc::new(ScriptedRunner::new().reply(0, "", ""));

        inspector(&runner)
            .open_folder(dir.path(), "cis_lvl1")
            .await
            .unwrap();
        let calls = runner.calls();
        assert_eq!(calls[0].program, opener());
        assert_eq!(calls[0].args, vec![out.to_string_lossy().into_owned()]);

        let err = inspector(&runner)
            .open_folder(dir.path(), "cis_lvl2")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }
}
