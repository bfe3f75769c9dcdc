//! Content-addressed package archives
//!
//! An archive is identified by package name and commit hash alone. Once
//! `dist/<name>-<commit>.zip` exists it is reused forever without looking at
//! its content; a commit's tree never changes, so neither does its archive.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use satis_fs::NormalizedPath;

use crate::Result;
use crate::config::DIST_DIR_NAME;

/// Archive type recorded in every dist entry.
pub const DIST_TYPE_ZIP: &str = "zip";

/// Download metadata of one package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dist {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Dist {
    pub fn zip(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: DIST_TYPE_ZIP.to_string(),
        }
    }
}

/// Whether `ensure` had to write the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStatus {
    /// Written by this call, holding `files` entries
    Built { files: usize },
    /// Already present; left untouched
    Reused,
}

/// Result of [`Archiver::ensure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub path: NormalizedPath,
    pub dist: Dist,
    pub status: ArchiveStatus,
}

/// Builds archives below `<out>/dist` and derives their public URLs.
#[derive(Debug, Clone)]
pub struct Archiver {
    dist_dir: NormalizedPath,
    public_base: String,
}

impl Archiver {
    /// `public_base` is used verbatim apart from trailing slashes.
    pub fn new(out_dir: &NormalizedPath, public_base: &str) -> Self {
        Self {
            dist_dir: out_dir.join(DIST_DIR_NAME),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// `<out>/dist/<name>-<commit>.zip`
    pub fn archive_path(&self, name: &str, commit: &str) -> NormalizedPath {
        self.dist_dir.join(&archive_file_name(name, commit))
    }

    /// `<public>/dist/<name>-<commit>.zip`
    pub fn dist_url(&self, name: &str, commit: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base,
            DIST_DIR_NAME,
            archive_file_name(name, commit)
        )
    }

    /// Make sure the archive of `root` for `name` at `commit` exists.
    ///
    /// Scoped names (`vendor/package`) create the vendor directory first.
    /// The archive is written to a temporary file and renamed into place, so
    /// an I/O failure never leaves a truncated archive behind to be reused.
    pub fn ensure(&self, root: &Path, name: &str, commit: &str) -> Result<ArchiveOutcome> {
        satis_fs::validate_relative_identifier(name)?;
        satis_fs::validate_relative_identifier(commit)?;

        let path = self.archive_path(name, commit);
        let dist = Dist::zip(self.dist_url(name, commit));

        if path.exists() {
            tracing::debug!(package = %name, commit = %commit, path = %path, "Reusing archive");
            return Ok(ArchiveOutcome {
                path,
                dist,
                status: ArchiveStatus::Reused,
            });
        }

        let mut files = 0;
        satis_fs::io::write_atomic_with(&path, |file| {
            files = write_zip(root, file)?;
            Ok(())
        })?;

        tracing::info!(package = %name, commit = %commit, files, path = %path, "Built archive");
        Ok(ArchiveOutcome {
            path,
            dist,
            status: ArchiveStatus::Built { files },
        })
    }
}

fn archive_file_name(name: &str, commit: &str) -> String {
    format!("{name}-{commit}.zip")
}

/// Write every file below `root` into a zip stream on `file`.
///
/// Entries are stored at their `/`-separated path relative to `root`, in
/// sorted order, with a fixed timestamp so identical trees produce identical
/// bytes. Directories are implied by their files and not stored. Links are
/// not followed during the walk; a link to a file is stored with the target's
/// content, links to directories and dangling links are left out.
pub fn write_zip(root: &Path, file: &mut File) -> io::Result<usize> {
    let mut zip = ZipWriter::new(file);
    let base = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut count = 0;
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let metadata = match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                tracing::debug!(path = %path.display(), "Skipping link to a directory");
                continue;
            }
            Err(e) if entry.path_is_symlink() => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping dangling link");
                continue;
            }
            Err(e) => return Err(e),
        };

        let relative = normalize_archive_path(path.strip_prefix(root).unwrap_or(path));
        zip.start_file(relative, with_permissions(base, &metadata))?;
        let mut source = File::open(path)?;
        io::copy(&mut source, &mut zip)?;
        count += 1;
    }

    zip.finish()?;
    Ok(count)
}

#[cfg(unix)]
fn with_permissions(options: FileOptions, metadata: &fs::Metadata) -> FileOptions {
    use std::os::unix::fs::PermissionsExt;
    options.unix_permissions(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn with_permissions(options: FileOptions, _metadata: &fs::Metadata) -> FileOptions {
    options
}

fn normalize_archive_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
