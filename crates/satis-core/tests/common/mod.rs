//! In-memory reference source for pipeline tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::fs;

use satis_git::{Error as GitError, RefSource, Reference, Snapshot};

/// Files of one reference, keyed by relative path.
pub type Tree = BTreeMap<String, String>;

/// A `RefSource` whose snapshots are written from in-memory trees.
#[derive(Default)]
pub struct FakeSource {
    tags: Vec<Reference>,
    branches: Vec<Reference>,
    trees: BTreeMap<String, Tree>,
    broken: HashSet<String>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, name: &str, commit: &str, tree: Tree) -> Self {
        self.tags.push(Reference::tag(name, commit));
        self.trees.insert(name.to_string(), tree);
        self
    }

    pub fn with_branch(mut self, name: &str, commit: &str, tree: Tree) -> Self {
        self.branches.push(Reference::remote_branch(name, commit));
        self.trees.insert(name.to_string(), tree);
        self
    }

    /// Make materializing `name` fail like an unreachable commit would.
    pub fn with_broken(mut self, name: &str) -> Self {
        self.broken.insert(name.to_string());
        self
    }
}

impl RefSource for FakeSource {
    fn tags(&self) -> satis_git::Result<Vec<Reference>> {
        Ok(self.tags.clone())
    }

    fn remote_branches(&self) -> satis_git::Result<Vec<Reference>> {
        Ok(self.branches.clone())
    }

    fn materialize(&self, reference: &Reference) -> satis_git::Result<Snapshot> {
        if self.broken.contains(&reference.name) {
            return Err(GitError::CheckoutFailed {
                reference: reference.name.clone(),
                message: "object not found".into(),
            });
        }
        let dir = tempfile::tempdir().unwrap();
        for (relative, content) in &self.trees[&reference.name] {
            let path = dir.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        Ok(Snapshot::new(reference.clone(), dir))
    }
}

/// Build a tree from `(path, content)` pairs.
pub fn tree(files: &[(&str, &str)]) -> Tree {
    files
        .iter()
        .map(|(path, content)| (path.to_string(), content.to_string()))
        .collect()
}

/// A tree holding one package named `name` at its root.
pub fn package(name: &str) -> Tree {
    tree(&[
        ("composer.json", &format!(r#"{{"name": "{name}", "type": "library"}}"#)),
        ("src/Lib.php", "<?php\n"),
    ])
}
