//! Baseline discovery and display labels

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::selection::{CatalogSource, SelectionMap};
use crate::config::{Config, GeneratorConfig};
use crate::Result;

/// Python-style title casing: a cased character is upper-cased when it
/// follows an uncased one (space, digit, punctuation) and lower-cased
/// otherwise.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_cased = false;
    for ch in s.chars() {
        let cased = ch.is_lowercase() || ch.is_uppercase();
        if cased && prev_cased {
            out.extend(ch.to_lowercase());
        } else if cased {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        prev_cased = cased;
    }
    out
}

/// Words of a stem, with `_` and `-` treated as separators
fn words(stem: &str) -> Vec<&str> {
    stem.split(['_', '-']).filter(|w| !w.is_empty()).collect()
}

/// Drop a family prefix (e.g. `cis`) from the first word
fn without_family<'a>(words: &[&'a str], family: &str) -> Vec<&'a str> {
    let mut rest = words.to_vec();
    if let Some(first) = rest.first().copied() {
        let has_family = first
            .get(..family.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(family));
        if has_family {
            let remainder = &first[family.len()..];
            if remainder.is_empty() {
                rest.remove(0);
            } else {
                rest[0] = remainder;
            }
        }
    }
    rest
}

fn join_label(prefix: &str, rest: &str) -> String {
    if rest.is_empty() {
        prefix.to_string()
    } else {
        format!("{} {}", prefix, rest)
    }
}

/// First `_`-separated token verbatim, the remainder title-cased
fn keep_revision(stem: &str) -> (String, String) {
    match stem.split_once('_') {
        Some((head, tail)) => (head.to_string(), title_case(&words(tail).join(" "))),
        None => (stem.to_string(), String::new()),
    }
}

/// Human-readable label for a baseline file stem
///
/// Rules are checked in order against the lower-cased stem; the first match
/// wins and anything unmatched is title-cased.
pub fn baseline_label(stem: &str) -> String {
    let lower = stem.to_lowercase();
    let all_words = words(stem);

    if lower.contains("byod") {
        let rest = title_case(&without_family(&all_words, "cis").join(" "));
        join_label("CIS", &rest.replace("Byod", "BYOD"))
    } else if lower.contains("enterprise") {
        join_label("CIS", &title_case(&without_family(&all_words, "cis").join(" ")))
    } else if lower.contains("indigo") {
        join_label(
            "Indigo",
            &title_case(&without_family(&all_words, "indigo").join(" ")),
        )
    } else if lower.contains("cis") {
        join_label("CIS", &title_case(&without_family(&all_words, "cis").join(" ")))
    } else if lower.contains("800-53") {
        let (revision, rest) = keep_revision(stem);
        join_label(&format!("NIST {}", revision), &rest)
    } else if lower.contains("800-171") {
        let (revision, rest) = keep_revision(stem);
        join_label(&format!("NIST SP {}", revision), &rest)
    } else if lower.contains("cmmc") {
        join_label(
            "CMMC",
            &title_case(&without_family(&all_words, "cmmc").join(" ")),
        )
    } else if lower.contains("cnssi") {
        stem.to_uppercase().replace('_', " ")
    } else if lower.contains("all_rules") {
        "All Rules (complete)".to_string()
    } else {
        title_case(&all_words.join(" "))
    }
}

/// Common baselines offered when the clone has none
pub fn fallback_baselines() -> SelectionMap {
    [
        ("CIS Level 1", "cis_lvl1"),
        ("CIS Level 2", "cis_lvl2"),
        ("NIST 800-53r5 Low", "800-53r5_low"),
        ("NIST 800-53r5 Moderate", "800-53r5_moderate"),
        ("NIST 800-53r5 High", "800-53r5_high"),
    ]
    .into_iter()
    .collect()
}

/// Baselines available for selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaselineListing {
    pub baselines: SelectionMap,
    pub source: CatalogSource,
}

impl BaselineListing {
    /// First baseline in file order
    pub fn default_stem(&self) -> Option<&str> {
        self.baselines.first().map(|s| s.value.as_str())
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.baselines.find_value(stem).is_some()
    }
}

/// Scans the clone's baselines directory
#[derive(Debug, Clone)]
pub struct BaselineCatalog {
    generator: GeneratorConfig,
}

impl BaselineCatalog {
    pub fn new(config: &Config) -> Self {
        Self {
            generator: config.generator.clone(),
        }
    }

    /// Directory holding baseline definitions for `repo_path`
    pub fn baselines_dir(&self, repo_path: &Path) -> PathBuf {
        repo_path.join(&self.generator.baselines_dir)
    }

    /// Labelled baselines of the clone at `repo_path`, sorted by file name
    ///
    /// Falls back to [`fallback_baselines`] when the directory is missing,
    /// unreadable or holds no definitions.
    pub fn scan_baselines(&self, repo_path: &Path) -> BaselineListing {
        let dir = self.baselines_dir(repo_path);
        let stems = match self.baseline_stems(&dir) {
            Ok(stems) => stems,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), "Failed to read baselines: {}", e);
                Vec::new()
            }
        };

        if stems.is_empty() {
            tracing::warn!(dir = %dir.display(), "No baselines found, using defaults");
            return BaselineListing {
                baselines: fallback_baselines(),
                source: CatalogSource::Fallback,
            };
        }

        BaselineListing {
            baselines: stems
                .iter()
                .map(|stem| (baseline_label(stem), stem.as_str()))
                .collect(),
            source: CatalogSource::Local,
        }
    }

    /// Stems of definition files in `dir`, ordered by file name
    fn baseline_stems(&self, dir: &Path) -> Result<Vec<String>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == self.generator.baseline_extension);
            if !matches_ext {
                continue;
            }
            if let (Some(name), Some(stem)) = (
                path.file_name().and_then(|n| n.to_str()),
                path.file_stem().and_then(|s| s.to_str()),
            ) {
                files.push((name.to_string(), stem.to_string()));
            }
        }

        files.sort();
        Ok(files.into_iter().map(|(_, stem)| stem).collect())
    }
}
