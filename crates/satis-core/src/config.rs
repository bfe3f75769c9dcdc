//! Build configuration
//!
//! A [`BuildConfig`] carries everything a run needs besides the repository
//! itself: where to write, how to publish, what to look for and what to do
//! when a reference cannot be checked out.

use std::fmt;
use std::str::FromStr;

use satis_fs::NormalizedPath;

use crate::{Error, Result};

/// Manifest file searched for in every snapshot.
pub const DEFAULT_MANIFEST_NAME: &str = "composer.json";

/// Output directory used when none is given.
pub const DEFAULT_OUT_DIR: &str = "out";

/// Catalog file name inside the output directory.
pub const CATALOG_FILE_NAME: &str = "packages.json";

/// Archive directory inside the output directory and the public URI.
pub const DIST_DIR_NAME: &str = "dist";

/// What to do when a reference cannot be materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutPolicy {
    /// Stop the run; nothing is saved.
    #[default]
    Abort,
    /// Log a warning and continue with the next reference.
    Skip,
}

impl FromStr for CheckoutPolicy {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(CheckoutPolicy::Abort),
            "skip" | "continue" => Ok(CheckoutPolicy::Skip),
            _ => Err(Error::InvalidCheckoutPolicy {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CheckoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutPolicy::Abort => write!(f, "abort"),
            CheckoutPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// Settings for one build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Directory receiving `packages.json` and `dist/`
    pub out_dir: NormalizedPath,

    /// Public base URI archives are served from, without trailing slash
    pub public_base: String,

    /// File name identifying a package root
    pub manifest_name: String,

    pub checkout_policy: CheckoutPolicy,
}

impl BuildConfig {
    /// Create a config with the default manifest name and abort policy.
    ///
    /// Trailing slashes are trimmed from `public_base` so that dist URLs never
    /// contain `//dist/`.
    pub fn new(out_dir: impl Into<NormalizedPath>, public_base: &str) -> Self {
        Self {
            out_dir: out_dir.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            checkout_policy: CheckoutPolicy::default(),
        }
    }

    pub fn with_manifest_name(mut self, manifest_name: impl Into<String>) -> Self {
        self.manifest_name = manifest_name.into();
        self
    }

    pub fn with_checkout_policy(mut self, policy: CheckoutPolicy) -> Self {
        self.checkout_policy = policy;
        self
    }

    /// Check the settings before any side effect happens.
    pub fn validate(&self) -> Result<()> {
        if self.out_dir.as_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "output directory must not be empty".into(),
            });
        }
        if self.manifest_name.is_empty()
            || self.manifest_name.contains('/')
            || self.manifest_name.contains('\\')
            || self.manifest_name == "."
            || self.manifest_name == ".."
        {
            return Err(Error::InvalidConfig {
                message: format!(
                    "manifest name '{}' must be a plain file name",
                    self.manifest_name
                ),
            });
        }
        Ok(())
    }

    /// Location of the catalog document.
    pub fn catalog_path(&self) -> NormalizedPath {
        self.out_dir.join(CATALOG_FILE_NAME)
    }

    /// Directory holding the archives.
    pub fn dist_dir(&self) -> NormalizedPath {
        self.out_dir.join(DIST_DIR_NAME)
    }
}
