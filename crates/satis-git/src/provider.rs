//! Reference source trait and the values it produces

use std::path::Path;

use tempfile::TempDir;

use crate::Result;

/// Kind of reference a version was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Tag,
    Branch,
}

/// A named pointer to a commit in the source repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Reference name as git reports it (`v1.2.0`, `origin/feature-x`)
    pub name: String,

    /// Version string published in the catalog
    pub version_label: String,

    /// Full hex id of the commit the reference peels to
    pub commit_hash: String,

    pub kind: RefKind,
}

impl Reference {
    pub fn tag(name: impl Into<String>, commit_hash: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            version_label: crate::naming::tag_version_label(&name),
            name,
            commit_hash: commit_hash.into(),
            kind: RefKind::Tag,
        }
    }

    pub fn remote_branch(name: impl Into<String>, commit_hash: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            version_label: crate::naming::branch_version_label(&name),
            name,
            commit_hash: commit_hash.into(),
            kind: RefKind::Branch,
        }
    }
}

/// The materialized content of one reference.
///
/// Owns its directory; the tree is removed when the snapshot is dropped.
#[derive(Debug)]
pub struct Snapshot {
    reference: Reference,
    dir: TempDir,
}

impl Snapshot {
    pub fn new(reference: Reference, dir: TempDir) -> Self {
        Self { reference, dir }
    }

    /// Root directory of the checked-out tree.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }
}

/// Trait for the repository operations the build pipeline needs.
///
/// Implementations must keep snapshots independent of each other: producing a
/// new snapshot never alters the content of one handed out earlier.
pub trait RefSource {
    /// All tags, each labelled with its verbatim name.
    fn tags(&self) -> Result<Vec<Reference>>;

    /// All remote-tracking branches, labelled `dev-<branch>`.
    fn remote_branches(&self) -> Result<Vec<Reference>>;

    /// Check out `reference` into a fresh snapshot directory.
    fn materialize(&self, reference: &Reference) -> Result<Snapshot>;

    /// Tags followed by remote branches, in build order.
    fn references(&self) -> Result<Vec<Reference>> {
        let mut refs = self.tags()?;
        refs.extend(self.remote_branches()?);
        Ok(refs)
    }
}
