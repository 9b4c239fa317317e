use git2::build::CheckoutBuilder;
use git2::{BranchType, ErrorCode, FetchOptions, ObjectType, PushOptions, RemoteCallbacks};
use std::cell::RefCell;
use tracing::debug;

use super::{BranchRef, GitError, GitRepo, PullOutcome, short_branch_name};

/// Credential lookup for network remotes: ssh-agent, then the configured git
/// credential helper, then libgit2's defaults.
fn credential_callbacks<'a>(config: Option<git2::Config>) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed| {
        if allowed.is_ssh_key() {
            if let Some(user) = username_from_url {
                return git2::Cred::ssh_key_from_agent(user);
            }
        }
        if allowed.is_user_pass_plaintext() {
            if let Some(cfg) = config.as_ref() {
                if let Ok(cred) = git2::Cred::credential_helper(cfg, url, username_from_url) {
                    return Ok(cred);
                }
            }
        }
        git2::Cred::default()
    });
    callbacks
}

impl GitRepo {
    /// All local branches, short name and canonical reference name.
    pub fn local_branches(&self) -> Result<Vec<BranchRef>, GitError> {
        let mut branches = Vec::new();

        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            // Names that are not valid UTF-8 cannot be named in the config anyway
            let Some(short) = branch.name()? else { continue };
            let Some(canonical) = branch.get().name() else { continue };
            branches.push(BranchRef {
                short: short.to_string(),
                canonical: canonical.to_string(),
            });
        }

        Ok(branches)
    }

    /// Names of all configured remotes.
    pub fn remote_names(&self) -> Result<Vec<String>, GitError> {
        let remotes = self.repo.remotes()?;
        Ok(remotes.iter().flatten().map(str::to_string).collect())
    }

    /// Switch the working tree to `branch`.
    ///
    /// The checkout is safe: local modifications that would be overwritten make it fail.
    pub fn checkout_branch(&self, branch: &str) -> Result<(), GitError> {
        let target = self
            .repo
            .find_reference(branch)?
            .peel(ObjectType::Commit)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        self.repo.checkout_tree(&target, Some(&mut checkout))?;
        self.repo.set_head(branch)?;

        Ok(())
    }

    /// Fetch `branch` from `remote_name` and fast-forward the local branch onto it.
    pub fn pull_fast_forward(
        &self,
        remote_name: &str,
        branch: &str,
    ) -> Result<PullOutcome, GitError> {
        let short = short_branch_name(branch).ok_or_else(|| GitError::NotABranch {
            reference: branch.to_string(),
        })?;
        let tracking = format!("refs/remotes/{remote_name}/{short}");
        let refspec = format!("+{branch}:{tracking}");

        let mut remote = self.repo.find_remote(remote_name)?;
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(credential_callbacks(self.repo.config().ok()));

        // A fetch that matches nothing leaves an old tracking ref in place
        if let Ok(mut stale) = self.repo.find_reference(&tracking) {
            stale.delete()?;
        }

        debug!("fetching {} from {}", refspec, remote_name);
        remote.fetch(&[refspec.as_str()], Some(&mut fetch_options), None)?;

        let fetched = match self.repo.refname_to_id(&tracking) {
            Ok(oid) => oid,
            Err(err) if err.code() == ErrorCode::NotFound => {
                return Err(GitError::RemoteBranchMissing {
                    remote: remote_name.to_string(),
                    reference: branch.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        let mut local = self.repo.find_reference(branch)?;
        let current = local.target().ok_or_else(|| GitError::NotABranch {
            reference: branch.to_string(),
        })?;

        let incoming = self.repo.find_annotated_commit(fetched)?;
        let (analysis, _) = self.repo.merge_analysis_for_ref(&local, &[&incoming])?;

        if analysis.is_up_to_date() {
            return Ok(PullOutcome::UpToDate);
        }

        if !analysis.is_fast_forward() {
            return Err(GitError::NonFastForward {
                remote: remote_name.to_string(),
                reference: branch.to_string(),
            });
        }

        let message = format!("gitsync: fast-forward {short} from {remote_name}");
        local.set_target(fetched, &message)?;

        let head_is_branch = self
            .repo
            .head()
            .ok()
            .is_some_and(|head| head.name() == Some(branch));
        if head_is_branch {
            let mut checkout = CheckoutBuilder::new();
            checkout.force();
            self.repo.checkout_head(Some(&mut checkout))?;
        }

        Ok(PullOutcome::FastForwarded {
            from: current,
            to: fetched,
        })
    }

    /// Push `refspec` to `remote_name`, surfacing per-reference rejections as errors.
    pub fn push_refspec(&self, remote_name: &str, refspec: &str) -> Result<(), GitError> {
        let mut remote = self.repo.find_remote(remote_name)?;
        let rejection: RefCell<Option<(String, String)>> = RefCell::new(None);

        {
            let mut callbacks = credential_callbacks(self.repo.config().ok());
            callbacks.push_update_reference(|reference, status| {
                if let Some(message) = status {
                    *rejection.borrow_mut() = Some((reference.to_string(), message.to_string()));
                }
                Ok(())
            });

            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(callbacks);
            remote.push(&[refspec], Some(&mut push_options))?;
        }

        if let Some((reference, message)) = rejection.into_inner() {
            return Err(GitError::PushRejected {
                remote: remote_name.to_string(),
                reference,
                message,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::mirror_refspec;
    use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature};
    use std::path::Path;
    use tempfile::TempDir;

    const MAIN: &str = "refs/heads/main";

    fn init_bare(path: &Path) -> Repository {
        let mut opts = RepositoryInitOptions::new();
        opts.bare(true).initial_head("main");
        Repository::init_opts(path, &opts).unwrap()
    }

    fn write_commit(repo: &Repository, refname: &str, parent: Option<Oid>, content: &str) -> Oid {
        let blob = repo.blob(content.as_bytes()).unwrap();
        let mut builder = repo.treebuilder(None).unwrap();
        builder.insert("README", blob, 0o100644).unwrap();
        let tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let parents: Vec<Commit> = parent
            .map(|oid| repo.find_commit(oid).unwrap())
            .into_iter()
            .collect();
        let parent_refs: Vec<&Commit> = parents.iter().collect();
        repo.commit(Some(refname), &sig, &sig, content, &tree, &parent_refs)
            .unwrap()
    }

    fn head_name(repo: &GitRepo) -> String {
        repo.repo.head().unwrap().name().unwrap().to_string()
    }

    /// origin (bare) with one commit on main, a clone of it, and an empty
    /// bare `internal` remote configured on the clone.
    struct Fixture {
        _tmp: TempDir,
        origin: Repository,
        internal: Repository,
        mirror: GitRepo,
        first: Oid,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let origin_dir = tmp.path().join("origin.git");
        let internal_dir = tmp.path().join("internal.git");
        let mirror_dir = tmp.path().join("mirror");

        let origin = init_bare(&origin_dir);
        let first = write_commit(&origin, MAIN, None, "first");
        let internal = init_bare(&internal_dir);

        let clone = Repository::clone(origin_dir.to_str().unwrap(), &mirror_dir).unwrap();
        clone
            .remote("internal", internal_dir.to_str().unwrap())
            .unwrap();
        drop(clone);

        let mirror = GitRepo::open(&mirror_dir).unwrap();
        Fixture {
            _tmp: tmp,
            origin,
            internal,
            mirror,
            first,
        }
    }

    #[test]
    fn test_local_branches_and_remotes() {
        let fx = fixture();

        let branches = fx.mirror.local_branches().unwrap();
        assert_eq!(branches, vec![BranchRef::new("main")]);

        let mut remotes = fx.mirror.remote_names().unwrap();
        remotes.sort();
        assert_eq!(remotes, vec!["internal".to_string(), "origin".to_string()]);
    }

    #[test]
    fn test_checkout_switches_head() {
        let fx = fixture();
        let commit = fx.mirror.repo.find_commit(fx.first).unwrap();
        fx.mirror.repo.branch("staging", &commit, false).unwrap();

        fx.mirror.checkout_branch("refs/heads/staging").unwrap();
        assert_eq!(head_name(&fx.mirror), "refs/heads/staging");

        fx.mirror.checkout_branch(MAIN).unwrap();
        assert_eq!(head_name(&fx.mirror), MAIN);
    }

    #[test]
    fn test_checkout_unknown_branch_fails() {
        let fx = fixture();
        assert!(fx.mirror.checkout_branch("refs/heads/missing").is_err());
    }

    #[test]
    fn test_pull_when_already_up_to_date() {
        let fx = fixture();
        let outcome = fx.mirror.pull_fast_forward("origin", MAIN).unwrap();
        assert_eq!(outcome, PullOutcome::UpToDate);
    }

    #[test]
    fn test_pull_fast_forwards_branch_and_worktree() {
        let fx = fixture();
        let second = write_commit(&fx.origin, MAIN, Some(fx.first), "second");

        fx.mirror.checkout_branch(MAIN).unwrap();
        let outcome = fx.mirror.pull_fast_forward("origin", MAIN).unwrap();

        assert_eq!(
            outcome,
            PullOutcome::FastForwarded {
                from: fx.first,
                to: second
            }
        );
        assert_eq!(fx.mirror.repo.refname_to_id(MAIN).unwrap(), second);
        let workdir = fx.mirror.repo.workdir().unwrap();
        let readme = std::fs::read_to_string(workdir.join("README")).unwrap();
        assert_eq!(readme, "second");
    }

    #[test]
    fn test_pull_refuses_diverged_branch() {
        let fx = fixture();
        write_commit(&fx.origin, MAIN, Some(fx.first), "upstream");
        let local = write_commit(&fx.mirror.repo, MAIN, Some(fx.first), "local");

        let err = fx.mirror.pull_fast_forward("origin", MAIN).unwrap_err();
        assert!(matches!(err, GitError::NonFastForward { .. }));
        // Local branch is left untouched
        assert_eq!(fx.mirror.repo.refname_to_id(MAIN).unwrap(), local);
    }

    #[test]
    fn test_pull_fails_when_source_branch_was_deleted() {
        let fx = fixture();
        let dev = "refs/heads/dev";
        write_commit(&fx.origin, dev, Some(fx.first), "dev");
        let commit = fx.mirror.repo.find_commit(fx.first).unwrap();
        fx.mirror.repo.branch("dev", &commit, false).unwrap();

        // Populates refs/remotes/origin/dev
        let fetched = fx.mirror.pull_fast_forward("origin", dev).unwrap();
        assert!(matches!(fetched, PullOutcome::FastForwarded { .. }));
        let synced = fx.mirror.repo.refname_to_id(dev).unwrap();

        fx.origin.find_reference(dev).unwrap().delete().unwrap();

        let err = fx.mirror.pull_fast_forward("origin", dev).unwrap_err();
        assert!(matches!(
            err,
            GitError::RemoteBranchMissing { ref remote, ref reference }
                if remote == "origin" && reference == dev
        ));
        assert_eq!(fx.mirror.repo.refname_to_id(dev).unwrap(), synced);
        assert!(fx.mirror.repo.find_reference("refs/remotes/origin/dev").is_err());
    }

    #[test]
    fn test_pull_rejects_non_branch_reference() {
        let fx = fixture();
        let err = fx
            .mirror
            .pull_fast_forward("origin", "refs/tags/v1")
            .unwrap_err();
        assert!(matches!(err, GitError::NotABranch { .. }));
    }

    #[test]
    fn test_pull_from_unknown_remote_fails() {
        let fx = fixture();
        assert!(fx.mirror.pull_fast_forward("upstream", MAIN).is_err());
    }

    #[test]
    fn test_push_mirrors_branch_and_is_repeatable() {
        let fx = fixture();
        let refspec = mirror_refspec(MAIN);

        fx.mirror.push_refspec("internal", &refspec).unwrap();
        assert_eq!(fx.internal.refname_to_id(MAIN).unwrap(), fx.first);

        // Nothing new to send
        fx.mirror.push_refspec("internal", &refspec).unwrap();
        assert_eq!(fx.internal.refname_to_id(MAIN).unwrap(), fx.first);
    }

    #[test]
    fn test_push_fails_when_target_diverged() {
        let fx = fixture();
        write_commit(&fx.internal, MAIN, None, "unrelated");

        let result = fx.mirror.push_refspec("internal", &mirror_refspec(MAIN));
        assert!(result.is_err());
    }
}
