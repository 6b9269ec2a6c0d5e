//! CLI command implementations

pub mod baselines;
pub mod branches;
pub mod doctor;
pub mod generate;
pub mod outputs;
pub mod run;
pub mod status;
pub mod sync;

pub use baselines::BaselinesArgs;
pub use branches::BranchesArgs;
pub use doctor::DoctorArgs;
pub use generate::GenerateArgs;
pub use outputs::OutputsArgs;
pub use run::RunArgs;
pub use status::StatusArgs;
pub use sync::SyncArgs;

use clap::Args;
use mscp_core::{ArtifactKind, CatalogSource, SelectionMap};

/// Artifact selection shared by `generate` and `run`
///
/// Profiles and scripts are on by default.
#[derive(Args, Debug, Clone, Default)]
pub struct ArtifactFlags {
    /// Skip configuration profiles
    #[arg(long)]
    pub no_profiles: bool,

    /// Skip compliance scripts
    #[arg(long)]
    pub no_scripts: bool,

    /// Also generate DDM artifacts
    #[arg(long)]
    pub ddm: bool,

    /// Also generate SCAP/XCCDF tags
    #[arg(long)]
    pub scap_tags: bool,
}

impl ArtifactFlags {
    pub fn selected(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                ArtifactKind::Profiles => !self.no_profiles,
                ArtifactKind::Scripts => !self.no_scripts,
                ArtifactKind::Ddm => self.ddm,
                ArtifactKind::ScapTags => self.scap_tags,
            })
            .collect()
    }
}

/// Tell the user when a listing is the built-in default set
pub fn print_source_notice(what: &str, source: CatalogSource) {
    if source.is_fallback() {
        println!(
            "Note: could not discover {}; showing built-in defaults.",
            what
        );
        println!();
    }
}

/// Print `label  (value)` rows, marking `current`
pub fn print_selections(map: &SelectionMap, current: Option<&str>) {
    let width = map.labels().map(str::len).max().unwrap_or(0);
    for entry in map.iter() {
        let marker = if Some(entry.value.as_str()) == current {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:width$}  ({})",
            marker,
            entry.label,
            entry.value,
            width = width
        );
    }
}
