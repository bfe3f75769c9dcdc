//! Package manifests discovered inside snapshots
//!
//! Reading a manifest never fails the run. Every way a file can fall short
//! of a usable manifest is a [`ManifestLoad`] variant, and the pipeline skips
//! all of them except [`ManifestLoad::Loaded`].

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::archive::Dist;

/// A parsed manifest with a usable package name.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    name: String,
    fields: Map<String, Value>,
    root: PathBuf,
}

/// Outcome of reading one manifest file.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestLoad {
    Loaded(Manifest),
    /// The file could not be read
    Unreadable { reason: String },
    /// The content is not a JSON object
    Malformed { reason: String },
    /// No string `name` field
    Nameless,
    /// The name would place the archive outside `dist/`
    UnsafeName { name: String, reason: String },
}

impl ManifestLoad {
    /// Short reason for logging a skipped manifest.
    pub fn skip_reason(&self) -> Option<String> {
        match self {
            ManifestLoad::Loaded(_) => None,
            ManifestLoad::Unreadable { reason } => Some(format!("unreadable: {reason}")),
            ManifestLoad::Malformed { reason } => Some(format!("malformed: {reason}")),
            ManifestLoad::Nameless => Some("missing package name".to_string()),
            ManifestLoad::UnsafeName { name, reason } => {
                Some(format!("unsafe package name '{name}': {reason}"))
            }
        }
    }

    pub fn into_manifest(self) -> Option<Manifest> {
        match self {
            ManifestLoad::Loaded(manifest) => Some(manifest),
            _ => None,
        }
    }
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    ///
    /// The directory containing `path` becomes the package root.
    pub fn load(path: &Path) -> ManifestLoad {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, manifest_root(path)),
            Err(e) => ManifestLoad::Unreadable {
                reason: e.to_string(),
            },
        }
    }

    /// Parse manifest `text` for a package rooted at `root`.
    pub fn parse(text: &str, root: impl Into<PathBuf>) -> ManifestLoad {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                return ManifestLoad::Malformed {
                    reason: e.to_string(),
                };
            }
        };

        let Value::Object(fields) = value else {
            return ManifestLoad::Malformed {
                reason: "top level is not an object".to_string(),
            };
        };

        let name = match fields.get("name") {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => return ManifestLoad::Nameless,
        };

        if let Err(e) = satis_fs::validate_relative_identifier(&name) {
            return ManifestLoad::UnsafeName {
                reason: match e {
                    satis_fs::Error::InvalidIdentifier { reason, .. } => reason,
                    other => other.to_string(),
                },
                name,
            };
        }

        ManifestLoad::Loaded(Manifest {
            name,
            fields,
            root: root.into(),
        })
    }

    /// Package name, e.g. `acme/widget`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory whose files make up the package.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All manifest fields as written, including `name`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The catalog record for this manifest released as `version`.
    ///
    /// `version` and `dist` replace any fields of the same name.
    pub fn release(&self, version: &str, dist: &Dist) -> Value {
        let mut record = self.fields.clone();
        record.insert("version".to_string(), Value::String(version.to_string()));
        record.insert("dist".to_string(), serde_json::json!(dist));
        Value::Object(record)
    }
}

fn manifest_root(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
