//! Selection catalogs for platform branches and baselines
//!
//! Both catalogs produce an ordered label -> value mapping for display and
//! fall back to a small static set when nothing can be discovered.

mod baselines;
mod branches;
mod selection;

pub use baselines::{baseline_label, fallback_baselines, BaselineCatalog, BaselineListing};
pub use branches::{
    fallback_branches, is_excluded_branch, parse_ls_remote, platform_display_map, platform_label,
    BranchCatalog, BranchListing, NEWEST_MACOS_LABEL, PREVIOUS_MACOS_LABEL,
};
pub use selection::{CatalogSource, Selection, SelectionMap};
