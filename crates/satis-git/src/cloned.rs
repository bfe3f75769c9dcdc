//! Single-clone repository backed by libgit2

use std::cell::Cell;
use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, Cred, CredentialType, FetchOptions, Oid, ReferenceType, RemoteCallbacks,
    Repository,
};
use tempfile::TempDir;

use crate::{
    Error, Result,
    naming::redact_uri,
    provider::{RefSource, Reference, Snapshot},
};

/// Give up after this many credential callbacks for one clone.
const MAX_AUTH_ATTEMPTS: usize = 3;

/// A clone of the source repository living in a scratch directory.
///
/// All references are materialized from this one clone. The clone is bare;
/// each snapshot is a checkout into its own directory below the scratch root.
pub struct ClonedRepository {
    repo: Repository,
    snapshots_root: PathBuf,
    // Dropped last: removes the clone and any leftover snapshots.
    scratch: TempDir,
}

impl ClonedRepository {
    /// Bare-clone `uri` into a fresh directory under the system temp path.
    ///
    /// Credentials embedded in the URI are used by libgit2 directly; a git
    /// credential helper or ssh-agent is consulted otherwise.
    pub fn clone_from(uri: &str) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("git-satis")
            .tempdir()
            .map_err(|e| satis_fs::Error::io(std::env::temp_dir(), e))?;
        let clone_path = scratch.path().join("repo");

        tracing::info!(uri = %redact_uri(uri), path = %clone_path.display(), "Cloning repository");

        let config = git2::Config::open_default().ok();
        let attempts = Cell::new(0usize);
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|url, username, allowed| {
            attempts.set(attempts.get() + 1);
            if attempts.get() > MAX_AUTH_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }
            if allowed.contains(CredentialType::SSH_KEY) {
                return Cred::ssh_key_from_agent(username.unwrap_or("git"));
            }
            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
                && let Some(config) = &config
            {
                return Cred::credential_helper(config, url, username);
            }
            Cred::default()
        });

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks);

        let repo = RepoBuilder::new()
            .bare(true)
            .fetch_options(fetch)
            .clone(uri, &clone_path)
            .map_err(|e| Error::CloneFailed {
                uri: redact_uri(uri),
                message: e.message().replace(uri, &redact_uri(uri)),
            })?;

        Self::with_scratch(repo, scratch)
    }

    /// Use an existing local clone. Snapshots go to a new scratch directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::open(path.as_ref())?;
        let scratch = tempfile::Builder::new()
            .prefix("git-satis")
            .tempdir()
            .map_err(|e| satis_fs::Error::io(std::env::temp_dir(), e))?;
        Self::with_scratch(repo, scratch)
    }

    fn with_scratch(repo: Repository, scratch: TempDir) -> Result<Self> {
        let snapshots_root = scratch.path().join("snapshots");
        std::fs::create_dir_all(&snapshots_root)
            .map_err(|e| satis_fs::Error::io(&snapshots_root, e))?;
        Ok(Self {
            repo,
            snapshots_root,
            scratch,
        })
    }

    /// Scratch directory holding the clone and the snapshots.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

impl RefSource for ClonedRepository {
    fn tags(&self) -> Result<Vec<Reference>> {
        let names = self
            .repo
            .tag_names(None)
            .map_err(|e| Error::ReferencesUnreadable {
                message: e.message().to_string(),
            })?;

        let mut tags = Vec::with_capacity(names.len());
        for name in names.iter().flatten() {
            let refname = format!("refs/tags/{name}");
            let commit = match self
                .repo
                .find_reference(&refname)
                .and_then(|r| r.peel_to_commit())
            {
                Ok(commit) => commit,
                Err(e) => {
                    tracing::warn!(tag = %name, error = %e, "Skipping tag that does not point to a commit");
                    continue;
                }
            };
            tags.push(Reference::tag(name, commit.id().to_string()));
        }

        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(count = tags.len(), "Enumerated tags");
        Ok(tags)
    }

    fn remote_branches(&self) -> Result<Vec<Reference>> {
        let branches = self
            .repo
            .branches(Some(BranchType::Remote))
            .map_err(|e| Error::ReferencesUnreadable {
                message: e.message().to_string(),
            })?;

        let mut refs = Vec::new();
        for item in branches {
            let (branch, _) = item?;
            let reference = branch.get();

            // origin/HEAD only aliases another remote branch
            if reference.kind() == Some(ReferenceType::Symbolic) {
                continue;
            }

            let Some(name) = branch.name()? else {
                tracing::warn!("Skipping remote branch with non UTF-8 name");
                continue;
            };
            if name.ends_with("/HEAD") {
                continue;
            }

            let commit = match reference.peel_to_commit() {
                Ok(commit) => commit,
                Err(e) => {
                    tracing::warn!(branch = %name, error = %e, "Skipping branch that does not point to a commit");
                    continue;
                }
            };
            refs.push(Reference::remote_branch(name, commit.id().to_string()));
        }

        refs.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(count = refs.len(), "Enumerated remote branches");
        Ok(refs)
    }

    fn materialize(&self, reference: &Reference) -> Result<Snapshot> {
        let checkout_failed = |message: String| Error::CheckoutFailed {
            reference: reference.name.clone(),
            message,
        };

        let oid = Oid::from_str(&reference.commit_hash)
            .map_err(|e| checkout_failed(e.message().to_string()))?;
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|e| checkout_failed(e.message().to_string()))?;
        let tree = commit
            .tree()
            .map_err(|e| checkout_failed(e.message().to_string()))?;

        let dir = tempfile::Builder::new()
            .prefix("snapshot-")
            .tempdir_in(&self.snapshots_root)
            .map_err(|e| satis_fs::Error::io(&self.snapshots_root, e))?;

        // Attributes are read from the index, so filters follow this tree's
        // .gitattributes. The in-memory index is never written back.
        let mut index = self.repo.index()?;
        index
            .read_tree(&tree)
            .map_err(|e| checkout_failed(e.message().to_string()))?;

        let mut checkout = CheckoutBuilder::new();
        checkout
            .target_dir(dir.path())
            .force()
            .recreate_missing(true)
            .update_index(false);
        self.repo
            .checkout_tree(tree.as_object(), Some(&mut checkout))
            .map_err(|e| checkout_failed(e.message().to_string()))?;

        tracing::debug!(
            reference = %reference.name,
            commit = %reference.commit_hash,
            path = %dir.path().display(),
            "Materialized snapshot"
        );
        Ok(Snapshot::new(reference.clone(), dir))
    }
}
