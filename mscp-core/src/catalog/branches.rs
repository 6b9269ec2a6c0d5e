//! Platform branch discovery

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::selection::{CatalogSource, Selection, SelectionMap};
use crate::config::Config;
use crate::git::RemoteUrl;
use crate::process::{CommandRunner, CommandSpec};
use crate::{Error, Result};

/// Label of the newest macOS platform branch
pub const NEWEST_MACOS_LABEL: &str = "macOS 26 Tahoe";

/// Label of the previous macOS platform branch
pub const PREVIOUS_MACOS_LABEL: &str = "macOS 15 Sequoia";

/// Known platform branches and their display labels
const PLATFORM_LABELS: &[(&str, &str)] = &[
    ("tahoe", NEWEST_MACOS_LABEL),
    ("sequoia", PREVIOUS_MACOS_LABEL),
    ("sonoma", "macOS 14 Sonoma"),
    ("ventura", "macOS 13 Ventura"),
    ("monterey", "macOS 12 Monterey"),
    ("big_sur", "macOS 11 Big Sur"),
    ("catalina", "macOS 10.15 Catalina"),
    ("ios_26", "iOS/iPadOS 26"),
    ("ios_18", "iOS/iPadOS 18"),
    ("ios_17", "iOS/iPadOS 17"),
    ("ios_16", "iOS/iPadOS 16"),
    ("visionos_26", "visionOS 26"),
    ("visionos_2", "visionOS 2"),
    ("main", "main (development - not recommended)"),
];

/// Development and housekeeping branch naming conventions
const EXCLUDED_PREFIXES: &[&str] = &["dev", "nist-", "505-"];
const EXCLUDED_SUBSTRINGS: &[&str] = &["_fix", "_typo", "create-"];

/// Display label for a known platform branch
pub fn platform_label(branch: &str) -> Option<&'static str> {
    PLATFORM_LABELS
        .iter()
        .find(|(name, _)| *name == branch)
        .map(|(_, label)| *label)
}

/// Whether a branch follows a development/internal naming convention
pub fn is_excluded_branch(branch: &str) -> bool {
    EXCLUDED_PREFIXES.iter().any(|p| branch.starts_with(p))
        || EXCLUDED_SUBSTRINGS.iter().any(|s| branch.contains(s))
}

/// Branch names from `git ls-remote --heads` output, sorted
pub fn parse_ls_remote(stdout: &str) -> Vec<String> {
    let mut branches: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.rsplit("refs/heads/").next())
        .map(str::to_string)
        .collect();
    branches.sort();
    branches
}

/// Label and filter raw branch names, keeping their order
pub fn platform_display_map(branches: &[String]) -> SelectionMap {
    let mut map = SelectionMap::new();
    for branch in branches {
        if is_excluded_branch(branch) {
            continue;
        }
        match platform_label(branch) {
            Some(label) => map.insert(label, branch.as_str()),
            None => map.insert(branch.as_str(), branch.as_str()),
        }
    }
    map
}

/// Minimal branch set used when the remote cannot be queried
pub fn fallback_branches() -> SelectionMap {
    [
        (NEWEST_MACOS_LABEL, "tahoe"),
        (PREVIOUS_MACOS_LABEL, "sequoia"),
        ("iOS 26", "ios_26"),
    ]
    .into_iter()
    .collect()
}

/// Branches available for selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchListing {
    pub branches: SelectionMap,
    pub source: CatalogSource,
}

impl BranchListing {
    /// Build a listing from a fetched mapping, falling back when it is empty
    pub fn from_fetched(branches: SelectionMap) -> Self {
        if branches.is_empty() {
            Self {
                branches: fallback_branches(),
                source: CatalogSource::Fallback,
            }
        } else {
            Self {
                branches,
                source: CatalogSource::Remote,
            }
        }
    }

    /// Newest macOS, then the previous macOS, then the first entry
    pub fn default_selection(&self) -> Option<&Selection> {
        [NEWEST_MACOS_LABEL, PREVIOUS_MACOS_LABEL]
            .iter()
            .find_map(|label| self.branches.iter().find(|e| e.label == *label))
            .or_else(|| self.branches.first())
    }

    /// Honour a preferred branch name if it is listed, else the default
    pub fn select(&self, preferred: Option<&str>) -> Option<&Selection> {
        preferred
            .and_then(|name| self.branches.find_value(name))
            .or_else(|| self.default_selection())
    }
}

/// Queries the remote for platform branches
#[derive(Clone)]
pub struct BranchCatalog {
    runner: Arc<dyn CommandRunner>,
    remote: RemoteUrl,
    timeout: Duration,
}

impl std::fmt::Debug for BranchCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchCatalog")
            .field("remote", &self.remote.clone_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BranchCatalog {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config) -> Result<Self> {
        Ok(Self {
            runner,
            remote: RemoteUrl::parse(&config.repository.remote)?,
            timeout: config.timeouts.ls_remote,
        })
    }

    /// Labelled branches of `remote`; empty on any failure
    pub async fn fetch_branches(&self, remote: &RemoteUrl) -> SelectionMap {
        match self.list_remote_heads(remote).await {
            Ok(branches) => platform_display_map(&branches),
            Err(e) => {
                tracing::warn!(remote = %remote, "Failed to list remote branches: {}", e);
                SelectionMap::new()
            }
        }
    }

    /// Branches of the configured remote, with offline defaults if needed
    pub async fn load(&self) -> BranchListing {
        let listing = BranchListing::from_fetched(self.fetch_branches(&self.remote).await);
        if listing.source.is_fallback() {
            tracing::warn!(remote = %self.remote, "Using offline default branch list");
        }
        listing
    }

    async fn list_remote_heads(&self, remote: &RemoteUrl) -> Result<Vec<String>> {
        let spec = CommandSpec::new("git")
            .args(["ls-remote", "--heads"])
            .arg(remote.clone_url.as_str())
            .timeout(self.timeout);

        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Err(Error::ExternalFailure {
                command: spec.to_string(),
                code: output.code,
                output: output.combined(),
            });
        }

        Ok(parse_ls_remote(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::ScriptedRunner;

    const SAMPLE_LS_REMOTE: &str = "\
1111111111111111111111111111111111111111\trefs/heads/sequoia
2222222222222222222222222222222222222222\trefs/heads/main
3333333333333333333333333333333333333333\trefs/heads/dev_2.0
4444444444444444444444444444444444444444\trefs/heads/tahoe
5555555555555555555555555555555555555555\trefs/heads/nist-review
6666666666666666666666666666666666666666\trefs/heads/505-fixes
7777777777777777777777777777777777777777\trefs/heads/sonoma_typo
8888888888888888888888888888888888888888\trefs/heads/ios_18
9999999999999999999999999999999999999999\trefs/heads/create-baseline
aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\trefs/heads/sonoma
bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb\trefs/heads/ventura_fix
cccccccccccccccccccccccccccccccccccccccc\trefs/heads/experimental
";

    fn sample() -> Vec<String> {
        parse_ls_remote(SAMPLE_LS_REMOTE)
    }

    #[test]
    fn test_parse_ls_remote_sorted() {
        let branches = sample();
        assert_eq!(branches.len(), 12);
        assert_eq!(branches.first().map(String::as_str), Some("505-fixes"));
        assert_eq!(branches.last().map(String::as_str), Some("ventura_fix"));
        assert!(parse_ls_remote("\n\n").is_empty());
    }

    #[test]
    fn test_filtering_and_labels() {
        let map = platform_display_map(&sample());
        let entries: Vec<(&str, &str)> = map
            .iter()
            .map(|e| (e.label.as_str(), e.value.as_str()))
            .collect();

        assert_eq!(
            entries,
            vec![
                ("experimental", "experimental"),
                ("iOS/iPadOS 18", "ios_18"),
                ("main (development - not recommended)", "main"),
                (PREVIOUS_MACOS_LABEL, "sequoia"),
                ("macOS 14 Sonoma", "sonoma"),
                (NEWEST_MACOS_LABEL, "tahoe"),
            ]
        );
    }

    #[test]
    fn test_exclusions_apply_before_table() {
        for name in ["dev", "develop", "nist-sequoia", "505-tahoe", "tahoe_fix", "ios_26_typo", "create-sonoma"] {
            assert!(is_excluded_branch(name), "{name} should be excluded");
            assert!(platform_display_map(&[name.to_string()]).is_empty());
        }
        assert!(!is_excluded_branch("tahoe"));
        assert!(!is_excluded_branch("main"));
    }

    #[test]
    fn test_default_prefers_newest_macos() {
        let listing = BranchListing::from_fetched(platform_display_map(&sample()));
        assert_eq!(listing.source, CatalogSource::Remote);
        assert_eq!(listing.default_selection().unwrap().value, "tahoe");
    }

    #[test]
    fn test_default_falls_back_to_previous_then_first() {
        let without_tahoe: Vec<String> = sample().into_iter().filter(|b| b != "tahoe").collect();
        let listing = BranchListing::from_fetched(platform_display_map(&without_tahoe));
        assert_eq!(listing.default_selection().unwrap().value, "sequoia");

        let only_others = vec!["ios_18".to_string(), "experimental".to_string()];
        let listing = BranchListing::from_fetched(platform_display_map(&only_others));
        assert_eq!(listing.default_selection().unwrap().value, "ios_18");
    }

    #[test]
    fn test_select_honours_preference() {
        let listing = BranchListing::from_fetched(platform_display_map(&sample()));
        assert_eq!(listing.select(Some("sonoma")).unwrap().value, "sonoma");
        assert_eq!(listing.select(Some("catalina")).unwrap().value, "tahoe");
        assert_eq!(listing.select(None).unwrap().value, "tahoe");
    }

    #[test]
    fn test_fallback_set() {
        let listing = BranchListing::from_fetched(SelectionMap::new());
        assert_eq!(listing.source, CatalogSource::Fallback);
        assert_eq!(
            listing.branches.values().collect::<Vec<_>>(),
            vec!["tahoe", "sequoia", "ios_26"]
        );
        assert_eq!(listing.default_selection().unwrap().label, NEWEST_MACOS_LABEL);
    }

    #[tokio::test]
    async fn test_load_from_remote() {
        let runner = Arc::new(ScriptedRunner::new().reply(0, SAMPLE_LS_REMOTE, ""));
        let catalog = BranchCatalog::new(runner.clone(), &Config::default()).unwrap();

        let listing = catalog.load().await;
        assert_eq!(listing.source, CatalogSource::Remote);
        assert_eq!(listing.branches.len(), 6);

        let calls = runner.calls();
        assert_eq!(
            calls[0].to_string(),
            format!("git ls-remote --heads {}", crate::config::DEFAULT_REMOTE)
        );
        assert_eq!(calls[0].timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_load_falls_back_on_failure() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .reply(128, "", "fatal: unable to access: Could not resolve host\n")
                .fail(Error::Timeout {
                    command: "git ls-remote".into(),
                    timeout: Duration::from_secs(30),
                    output: String::new(),
                }),
        );
        let catalog = BranchCatalog::new(runner, &Config::default()).unwrap();

        assert_eq!(catalog.load().await.source, CatalogSource::Fallback);
        assert_eq!(catalog.load().await.source, CatalogSource::Fallback);
    }
}
