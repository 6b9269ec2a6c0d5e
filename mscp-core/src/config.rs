//! Configuration management for mSCP
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (MSCP_*)
//! 3. Config file (~/.config/mscp/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Upstream mSCP repository
pub const DEFAULT_REMOTE: &str = "https://github.com/usnistgov/macos_security.git";

/// Where the local clone lives and which remote it tracks
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Path to the local clone (may use `~`)
    pub path: String,

    /// Remote URL or `owner/repo` shorthand
    pub remote: String,

    /// Branch to preselect instead of the newest macOS release
    pub default_branch: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: "./macos_security".to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            default_branch: None,
        }
    }
}

/// Layout of the mSCP checkout and how its generator is launched
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Package runner used to invoke the generator
    pub runner: String,

    /// Generator script, relative to the repository root
    pub script: String,

    /// Requirements file handed to the runner
    pub requirements: String,

    /// Directory holding baseline definitions
    pub baselines_dir: String,

    /// Baseline definition file extension (without the dot)
    pub baseline_extension: String,

    /// Directory the generator writes into
    pub build_dir: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            runner: "uv".to_string(),
            script: "scripts/generate_guidance.py".to_string(),
            requirements: "requirements.txt".to_string(),
            baselines_dir: "baselines".to_string(),
            baseline_extension: "yaml".to_string(),
            build_dir: "build".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Absolute path of the generator script inside `repo`
    pub fn script_path(&self, repo: &Path) -> PathBuf {
        repo.join(&self.script)
    }

    /// Baseline file relative to the repository root
    pub fn baseline_file(&self, stem: &str) -> PathBuf {
        Path::new(&self.baselines_dir).join(format!("{}.{}", stem, self.baseline_extension))
    }

    /// Output directory for a baseline inside `repo`
    pub fn output_dir(&self, repo: &Path, baseline: &str) -> PathBuf {
        repo.join(&self.build_dir).join(baseline)
    }
}

/// Per-step time limits for external commands
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(with = "humantime_serde")]
    pub ls_remote: Duration,
    #[serde(with = "humantime_serde")]
    pub rev_parse: Duration,
    #[serde(with = "humantime_serde")]
    pub clone: Duration,
    #[serde(with = "humantime_serde")]
    pub set_branches: Duration,
    #[serde(with = "humantime_serde")]
    pub fetch: Duration,
    #[serde(with = "humantime_serde")]
    pub checkout: Duration,
    #[serde(with = "humantime_serde")]
    pub pull: Duration,
    #[serde(with = "humantime_serde")]
    pub generate: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ls_remote: Duration::from_secs(30),
            rev_parse: Duration::from_secs(10),
            clone: Duration::from_secs(120),
            set_branches: Duration::from_secs(30),
            fetch: Duration::from_secs(60),
            checkout: Duration::from_secs(30),
            pull: Duration::from_secs(60),
            generate: Duration::from_secs(300),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Repository configuration
    pub repository: RepositoryConfig,

    /// Generator configuration
    pub generator: GeneratorConfig,

    /// Command time limits
    pub timeouts: TimeoutConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/mscp/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mscp").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - MSCP_REPO_PATH: Local clone path
    /// - MSCP_REMOTE: Remote URL or shorthand
    /// - MSCP_BRANCH: Preselected platform branch
    /// - MSCP_RUNNER: Package runner executable
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("MSCP_REPO_PATH") {
            self.repository.path = path;
        }

        if let Ok(remote) = std::env::var("MSCP_REMOTE") {
            self.repository.remote = remote;
        }

        if let Ok(branch) = std::env::var("MSCP_BRANCH") {
            self.repository.default_branch = Some(branch);
        }

        if let Ok(runner) = std::env::var("MSCP_RUNNER") {
            self.generator.runner = runner;
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, repo_path: Option<String>, remote: Option<String>) -> Self {
        if let Some(path) = repo_path {
            self.repository.path = path;
        }

        if let Some(r) = remote {
            self.repository.remote = r;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(repo_path: Option<String>, remote: Option<String>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(repo_path, remote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.repository.path, "./macos_security");
        assert_eq!(config.repository.remote, DEFAULT_REMOTE);
        assert!(config.repository.default_branch.is_none());
        assert_eq!(config.generator.runner, "uv");
        assert_eq!(config.timeouts.clone, Duration::from_secs(120));
        assert_eq!(config.timeouts.generate, Duration::from_secs(300));
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_cli_overrides(
            Some("~/src/mscp".to_string()),
            Some("usnistgov/macos_security".to_string()),
        );

        assert_eq!(config.repository.path, "~/src/mscp");
        assert_eq!(config.repository.remote, "usnistgov/macos_security");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[repository]
path = "/opt/mscp"
default_branch = "sonoma"

[generator]
runner = "/usr/local/bin/uv"

[timeouts]
clone = "5m"
pull = "90s"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.repository.path, "/opt/mscp");
        assert_eq!(config.repository.default_branch.as_deref(), Some("sonoma"));
        assert_eq!(config.generator.runner, "/usr/local/bin/uv");
        assert_eq!(config.timeouts.clone, Duration::from_secs(300));
        assert_eq!(config.timeouts.pull, Duration::from_secs(90));
        // untouched keys keep their defaults
        assert_eq!(config.timeouts.checkout, Duration::from_secs(30));
        assert_eq!(config.generator.script, "scripts/generate_guidance.py");
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[generator]
build_dir = "out"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.repository.remote, DEFAULT_REMOTE);
        assert_eq!(config.generator.build_dir, "out");
    }

    #[test]
    fn test_generator_paths() {
        let generator = GeneratorConfig::default();
        let repo = Path::new("/tmp/mscp");
        assert_eq!(
            generator.script_path(repo),
            PathBuf::from("/tmp/mscp/scripts/generate_guidance.py")
        );
        assert_eq!(
            generator.baseline_file("cis_lvl1"),
            PathBuf::from("baselines/cis_lvl1.yaml")
        );
        assert_eq!(
            generator.output_dir(repo, "cis_lvl1"),
            PathBuf::from("/tmp/mscp/build/cis_lvl1")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[repository]\nremote = \"git@github.com:me/macos_security.git\"\n")
            .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.repository.remote, "git@github.com:me/macos_security.git");

        std::fs::write(&path, "[repository\n").unwrap();
        assert!(matches!(Config::load_from_file(&path), Err(Error::Config(_))));
    }
}
