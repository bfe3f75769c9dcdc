//! Source repository fixtures built with `git2`.
//!
//! A [`SourceRepo`] is a real, non-bare repository in a temporary directory
//! whose default branch is `main`. Tests write files, commit, then point tags
//! and branches at the resulting commits before cloning it through its path.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Oid, Repository, RepositoryInitOptions, Signature};
use tempfile::TempDir;

/// A throwaway git repository used as the remote in pipeline tests.
///
/// # Example
///
/// ```rust,no_run
/// use satis_test_utils::SourceRepo;
///
/// let source = SourceRepo::new();
/// source.write_manifest("", &serde_json::json!({"name": "acme/widget"}));
/// source.commit("Initial commit");
/// source.tag("v1.0.0");
/// ```
pub struct SourceRepo {
    repo: Repository,
    temp_dir: TempDir,
}

impl Default for SourceRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRepo {
    /// Initialise an empty repository with `main` as its initial branch.
    ///
    /// # Panics
    /// Panics if the repository cannot be created.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(temp_dir.path(), &opts)
            .unwrap_or_else(|e| panic!("SourceRepo::new: failed to init repository: {e}"));
        Self { repo, temp_dir }
    }

    /// Working directory of the repository.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// URI suitable for cloning this repository.
    pub fn uri(&self) -> String {
        self.path().to_string_lossy().into_owned()
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a pretty-printed `composer.json` inside `dir` (`""` for the root).
    pub fn write_manifest(&self, dir: &str, manifest: &serde_json::Value) -> PathBuf {
        let relative = if dir.is_empty() {
            "composer.json".to_string()
        } else {
            format!("{}/composer.json", dir.trim_end_matches('/'))
        };
        self.write(&relative, &serde_json::to_string_pretty(manifest).unwrap())
    }

    /// Create a symbolic link at `relative` pointing to `target`.
    #[cfg(unix)]
    pub fn symlink(&self, relative: &str, target: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        std::os::unix::fs::symlink(target, path).unwrap();
    }

    /// Delete a file or directory from the working directory.
    pub fn remove(&self, relative: &str) {
        let path = self.path().join(relative);
        if path.is_dir() {
            fs::remove_dir_all(&path).unwrap();
        } else {
            fs::remove_file(&path).unwrap();
        }
    }

    /// Stage every change in the working directory and commit it on HEAD.
    ///
    /// Returns the new commit's full hex id.
    pub fn commit(&self, message: &str) -> String {
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();

        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test User", "test@example.com").unwrap();

        let parent = self.head_oid().map(|oid| self.repo.find_commit(oid).unwrap());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
            .to_string()
    }

    /// Create a lightweight tag on HEAD.
    pub fn tag(&self, name: &str) {
        let head = self.head_object();
        self.repo.tag_lightweight(name, &head, false).unwrap();
    }

    /// Create an annotated tag on HEAD.
    pub fn annotated_tag(&self, name: &str) {
        let head = self.head_object();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        self.repo
            .tag(name, &head, &sig, &format!("Release {name}"), false)
            .unwrap();
    }

    /// Create a local branch at HEAD. Clones see it as `origin/<name>`.
    pub fn branch(&self, name: &str) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo.branch(name, &head, false).unwrap();
    }

    /// Full hex id of HEAD.
    ///
    /// # Panics
    /// Panics if nothing has been committed yet.
    pub fn head(&self) -> String {
        self.head_oid()
            .expect("SourceRepo::head: repository has no commits")
            .to_string()
    }

    fn head_oid(&self) -> Option<Oid> {
        self.repo.head().ok().and_then(|h| h.target())
    }

    fn head_object(&self) -> git2::Object<'_> {
        self.repo
            .head()
            .unwrap()
            .peel(git2::ObjectType::Commit)
            .unwrap()
    }
}
