//! # gitsync - keep branches mirrored between git remotes
//!
//! gitsync runs on a dedicated mirror checkout. For every branch listed in
//! its sync file it checks the branch out, fast-forwards it from a source
//! remote and pushes it, under the same name, to a target remote. A typical
//! use is carrying a public repository into a private CI system.
//!
//! ## Sync file
//!
//! `.gitsync.conf` (mode `0400`):
//!
//! ```json
//! {
//!   "sync": [
//!     { "source_remote": "origin", "target_remote": "internal", "branches": ["main"] }
//!   ]
//! }
//! ```
//!
//! ## Usage
//!
//! ```bash
//! gitsync -repodir /srv/mirror -config /etc/gitsync.conf
//! gitsync -debug          # show detected branches, remotes and skip reasons
//! gitsync -keep-going     # sync what can be synced, fail at the end
//! ```
//!
//! ## Library usage
//!
//! ```rust,no_run
//! use gitsync::config::SyncConfiguration;
//! use gitsync::git::GitRepo;
//! use gitsync::sync::{RepositoryState, SyncExecutor, SyncPlan};
//! use std::path::Path;
//!
//! let config = SyncConfiguration::load(Path::new(".gitsync.conf"), false)?;
//! let repo = GitRepo::open("/srv/mirror")?;
//! let state = RepositoryState::capture(&repo)?;
//! let plan = SyncPlan::build(&config, &state);
//! let report = SyncExecutor::new(&repo, &state).execute(&plan)?;
//! println!("{} branches synced", report.synced_count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod git;
pub mod sync;

pub use cli::{Cli, Output};
pub use config::{SyncConfiguration, SyncRule};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
