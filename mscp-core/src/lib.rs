//! mSCP Core - Core library for driving the macOS Security Compliance Project
//!
//! This crate locates and synchronises a local clone of the mSCP repository,
//! catalogues its branches and baselines, runs the guidance generator and
//! inspects what it produced.

pub mod catalog;
pub mod config;
pub mod doctor;
pub mod error;
pub mod generate;
pub mod git;
pub mod outputs;
pub mod process;
pub mod session;

pub use catalog::{
    BaselineCatalog, BaselineListing, BranchCatalog, BranchListing, CatalogSource, Selection,
    SelectionMap,
};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use generate::{ArtifactKind, GenerationInvoker, GenerationRequest, GenerationResult};
pub use git::{
    RemoteUrl, RepoLocator, RepositoryState, SyncAction, SyncController, SyncOutcome,
    SyncRequest, SyncToken, Transport,
};
pub use outputs::{ArtifactSummary, OutputInspector, OutputStatus};
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use session::Session;
