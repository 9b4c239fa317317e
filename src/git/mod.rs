//! Git integration layer for gitsync
//!
//! The sync engine never touches libgit2 directly. Everything it needs from
//! version control goes through [`VersionControl`], which [`GitRepo`]
//! implements on top of `git2`.

pub mod operations;

use git2::{Oid, Repository};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Namespace prefix of local branch references.
pub const BRANCH_PREFIX: &str = "refs/heads/";

#[derive(Debug, Error)]
pub enum GitError {
    #[error("could not open git working copy at {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("{} is a bare repository, a working tree is required", .path.display())]
    Bare { path: PathBuf },

    #[error("{reference} is not a local branch reference")]
    NotABranch { reference: String },

    #[error("{remote} has no branch {reference}")]
    RemoteBranchMissing { remote: String, reference: String },

    #[error("{reference} from {remote} is not a fast-forward of the local branch")]
    NonFastForward { remote: String, reference: String },

    #[error("{remote} rejected {reference}: {message}")]
    PushRejected {
        remote: String,
        reference: String,
        message: String,
    },

    #[error(transparent)]
    Git(#[from] git2::Error),
}

/// A local branch as seen by the inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    /// Display name, e.g. `main`
    pub short: String,
    /// Fully qualified name, e.g. `refs/heads/main`
    pub canonical: String,
}

impl BranchRef {
    pub fn new(short: impl Into<String>) -> Self {
        let short = short.into();
        let canonical = branch_ref_name(&short);
        Self { short, canonical }
    }
}

/// What a pull did to the local branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    UpToDate,
    FastForwarded { from: Oid, to: Oid },
}

/// The version-control capability the sync engine drives.
///
/// Branch arguments are canonical reference names (`refs/heads/<name>`).
pub trait VersionControl {
    /// List local branches.
    fn branches(&self) -> Result<Vec<BranchRef>, GitError>;

    /// List configured remote names.
    fn remotes(&self) -> Result<Vec<String>, GitError>;

    /// Make `branch` the checked-out branch of the working tree.
    fn checkout(&self, branch: &str) -> Result<(), GitError>;

    /// Fetch only `branch` from `remote` and fast-forward the local branch to it.
    fn pull(&self, remote: &str, branch: &str) -> Result<PullOutcome, GitError>;

    /// Push `refspec` to `remote`.
    fn push(&self, remote: &str, refspec: &str) -> Result<(), GitError>;
}

/// Canonical reference name for a short branch name.
pub fn branch_ref_name(short: &str) -> String {
    format!("{BRANCH_PREFIX}{short}")
}

/// Short branch name for a canonical reference, if it is a local branch.
pub fn short_branch_name(canonical: &str) -> Option<&str> {
    canonical
        .strip_prefix(BRANCH_PREFIX)
        .filter(|short| !short.is_empty())
}

/// Refspec that pushes a reference to the same name on the remote.
pub fn mirror_refspec(canonical: &str) -> String {
    format!("{canonical}:{canonical}")
}

/// A git working copy opened with libgit2.
pub struct GitRepo {
    pub repo: Repository,
}

impl GitRepo {
    /// Open the working copy at exactly `path`, without searching parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|source| GitError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        if repo.is_bare() {
            return Err(GitError::Bare {
                path: path.to_path_buf(),
            });
        }

        Ok(GitRepo { repo })
    }
}

impl VersionControl for GitRepo {
    fn branches(&self) -> Result<Vec<BranchRef>, GitError> {
        self.local_branches()
    }

    fn remotes(&self) -> Result<Vec<String>, GitError> {
        self.remote_names()
    }

    fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.checkout_branch(branch)
    }

    fn pull(&self, remote: &str, branch: &str) -> Result<PullOutcome, GitError> {
        self.pull_fast_forward(remote, branch)
    }

    fn push(&self, remote: &str, refspec: &str) -> Result<(), GitError> {
        self.push_refspec(remote, refspec)
    }
}
