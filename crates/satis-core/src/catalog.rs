//! The cumulative package catalog (`packages.json`)
//!
//! ```json
//! {"packages": {"acme/widget": {"v1.0.0": {"name": "acme/widget", "version": "v1.0.0", "dist": {...}}}}}
//! ```
//!
//! Entries are only ever added or overwritten. Versions whose reference has
//! disappeared from the repository stay in the catalog.

use serde_json::{Map, Value};

use satis_fs::NormalizedPath;

use crate::archive::Dist;
use crate::manifest::Manifest;
use crate::{Error, Result};

const PACKAGES_KEY: &str = "packages";

/// Outcome of reading an existing catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogLoad {
    Loaded(Catalog),
    /// No catalog file yet
    Absent,
    /// A file exists but holds no usable catalog
    Malformed { reason: String },
}

impl CatalogLoad {
    /// The loaded catalog, or an empty one for any other outcome.
    pub fn into_catalog(self) -> Catalog {
        match self {
            CatalogLoad::Loaded(catalog) => catalog,
            CatalogLoad::Absent | CatalogLoad::Malformed { .. } => Catalog::new(),
        }
    }
}

/// In-memory package catalog.
///
/// Top-level keys other than `packages` are carried through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    packages: Map<String, Value>,
    extra: Map<String, Value>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// An empty catalog: `{"packages": {}}`.
    pub fn new() -> Self {
        Self {
            packages: Map::new(),
            extra: Map::new(),
        }
    }

    /// Read the catalog at `path`.
    pub fn load(path: &NormalizedPath) -> CatalogLoad {
        if !path.exists() {
            return CatalogLoad::Absent;
        }
        match satis_fs::io::read_text(path) {
            Ok(text) => Self::parse(&text),
            Err(e) => CatalogLoad::Malformed {
                reason: e.to_string(),
            },
        }
    }

    /// Parse catalog JSON.
    ///
    /// A missing or non-object `packages` member is replaced by an empty one.
    /// Package members that are lists become maps keyed by index; any other
    /// non-object member is dropped.
    pub fn parse(text: &str) -> CatalogLoad {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                return CatalogLoad::Malformed {
                    reason: e.to_string(),
                };
            }
        };
        let Value::Object(mut document) = value else {
            return CatalogLoad::Malformed {
                reason: "top level is not an object".to_string(),
            };
        };

        let packages = match document.remove(PACKAGES_KEY) {
            Some(Value::Object(packages)) => packages
                .into_iter()
                .filter_map(|(name, versions)| match versions {
                    Value::Object(_) => Some((name, versions)),
                    // PHP writes version maps keyed "0", "1", ... as lists
                    Value::Array(items) => Some((name, Value::Object(index_keyed(items)))),
                    _ => {
                        tracing::warn!(package = %name, "Dropping catalog package that is not an object");
                        None
                    }
                })
                .collect(),
            // PHP-written catalogs encode an empty map as []
            Some(Value::Array(items)) if items.is_empty() => Map::new(),
            Some(_) => {
                tracing::warn!("Catalog 'packages' is not an object; starting it empty");
                Map::new()
            }
            None => Map::new(),
        };

        CatalogLoad::Loaded(Self {
            packages,
            extra: document,
        })
    }

    /// Insert or replace `packages[name][version]`.
    pub fn upsert(&mut self, manifest: &Manifest, version: &str, dist: &Dist) {
        let record = manifest.release(version, dist);
        let versions = self
            .packages
            .entry(manifest.name().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !versions.is_object() {
            *versions = Value::Object(Map::new());
        }
        if let Value::Object(versions) = versions {
            versions.insert(version.to_string(), record);
        }
    }

    /// The record of `name` at `version`.
    pub fn entry(&self, name: &str, version: &str) -> Option<&Value> {
        self.packages.get(name)?.as_object()?.get(version)
    }

    /// Version labels known for `name`, sorted.
    pub fn versions(&self, name: &str) -> Vec<&str> {
        self.packages
            .get(name)
            .and_then(Value::as_object)
            .map(|versions| versions.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Package names in the catalog, sorted.
    pub fn package_names(&self) -> Vec<&str> {
        self.packages.keys().map(String::as_str).collect()
    }

    /// Total number of version records across all packages.
    pub fn len(&self) -> usize {
        self.packages
            .values()
            .filter_map(Value::as_object)
            .map(Map::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole catalog document.
    pub fn as_value(&self) -> Value {
        let mut document = self.extra.clone();
        document.insert(
            PACKAGES_KEY.to_string(),
            Value::Object(self.packages.clone()),
        );
        Value::Object(document)
    }

    /// Pretty-printed JSON of the whole document.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.as_value()).map_err(|e| Error::CatalogSerialize {
            message: e.to_string(),
        })
    }

    /// Write the catalog to `path`, replacing any existing file atomically.
    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        let mut content = self.to_json_pretty()?;
        content.push('\n');
        satis_fs::io::write_atomic(path, content.as_bytes())?;
        tracing::debug!(path = %path, entries = self.len(), "Saved catalog");
        Ok(())
    }
}

fn index_keyed(items: Vec<Value>) -> Map<String, Value> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| (index.to_string(), item))
        .collect()
}
