//! Host prerequisite checks

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;

/// One tool the workflow shells out to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prerequisite {
    pub name: String,
    /// Resolved location on PATH
    pub path: Option<PathBuf>,
    /// How to install it when missing
    pub hint: &'static str,
}

impl Prerequisite {
    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }
}

fn lookup(name: &str, hint: &'static str) -> Prerequisite {
    Prerequisite {
        name: name.to_string(),
        path: which::which(name).ok(),
        hint,
    }
}

/// Check `git` and the configured package runner
pub fn check_prerequisites(config: &Config) -> Vec<Prerequisite> {
    vec![
        lookup(
            "git",
            "Install git (macOS: xcode-select --install) to clone mSCP",
        ),
        lookup(
            &config.generator.runner,
            "curl -LsSf https://astral.sh/uv/install.sh | sh",
        ),
    ]
}
