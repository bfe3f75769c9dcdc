//! Recursive manifest discovery
//!
//! The walk is depth-first over the whole tree with no ignore rules and no
//! depth limit. Symbolic links are reported but never descended into, so a
//! link cycle cannot make the walk infinite.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Finds every file with a given name below a root directory.
#[derive(Debug, Clone)]
pub struct ManifestLocator {
    root: PathBuf,
    file_name: OsString,
}

impl ManifestLocator {
    /// Locate files named `file_name` below `root`.
    ///
    /// A relative `root` is made absolute against the current directory.
    pub fn new(root: impl AsRef<Path>, file_name: impl Into<OsString>) -> Self {
        let root = root.as_ref();
        Self {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
            file_name: file_name.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a fresh walk. Each call walks the tree again from the top.
    pub fn iter(&self) -> ManifestPaths<'_> {
        ManifestPaths {
            walker: WalkDir::new(&self.root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
            file_name: &self.file_name,
        }
    }
}

impl<'a> IntoIterator for &'a ManifestLocator {
    type Item = PathBuf;
    type IntoIter = ManifestPaths<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy sequence of manifest paths, in file-name order within each directory.
pub struct ManifestPaths<'a> {
    walker: walkdir::IntoIter,
    file_name: &'a OsString,
}

impl Iterator for ManifestPaths<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.walker.next()? {
                Ok(entry) => {
                    // A link named like the manifest may point at a directory
                    if entry.file_name() == self.file_name.as_os_str()
                        && !entry.file_type().is_dir()
                        && !entry.path().is_dir()
                    {
                        return Some(entry.into_path());
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unreadable directory entry");
                }
            }
        }
    }
}
