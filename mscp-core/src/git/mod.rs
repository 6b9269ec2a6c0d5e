//! Git operations for the local mSCP clone
//!
//! This module provides clone detection, remote parsing and the
//! clone / switch / pull synchronisation procedure.

mod locate;
mod remote;
mod sync;

pub use locate::{expand_path, RepoLocator, RepositoryState, UNKNOWN_BRANCH};
pub use remote::{RemoteUrl, Transport};
pub use sync::{SyncAction, SyncController, SyncFailure, SyncOutcome, SyncRequest, SyncToken};
