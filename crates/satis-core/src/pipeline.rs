//! Snapshot-to-catalog build pipeline
//!
//! ```text
//! references ──► materialize ──► locate manifests ──► archive ──► catalog
//!   (once)        (per ref)         (per snapshot)   (per manifest)  (save once)
//! ```
//!
//! The catalog is loaded before the first reference and saved after the
//! last. A run that fails part way saves nothing, so the catalog on disk
//! never holds half of a reference.

use satis_git::{RefSource, Reference, Snapshot};

use crate::archive::{ArchiveStatus, Archiver};
use crate::catalog::{Catalog, CatalogLoad};
use crate::config::{BuildConfig, CheckoutPolicy};
use crate::locator::ManifestLocator;
use crate::manifest::{Manifest, ManifestLoad};
use crate::Result;

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// References whose snapshot was scanned
    pub refs_processed: usize,
    /// References skipped after a checkout failure
    pub refs_skipped: usize,
    /// Manifest files that were unreadable, malformed or nameless
    pub manifests_skipped: usize,
    pub archives_built: usize,
    pub archives_reused: usize,
    /// Catalog records inserted or overwritten
    pub entries_written: usize,
}

/// Stateful pipeline over one output directory.
///
/// Use [`build`] to run every reference of a source; drive the pipeline by
/// hand to control which references are processed.
pub struct BuildPipeline {
    config: BuildConfig,
    archiver: Archiver,
    catalog: Catalog,
    report: BuildReport,
}

impl BuildPipeline {
    /// Validate `config`, create the output directory and load the catalog.
    ///
    /// A malformed catalog file is logged and replaced by an empty catalog.
    pub fn new(config: BuildConfig) -> Result<Self> {
        config.validate()?;
        satis_fs::io::ensure_dir(&config.out_dir)?;

        let catalog_path = config.catalog_path();
        let catalog = match Catalog::load(&catalog_path) {
            CatalogLoad::Loaded(catalog) => {
                tracing::debug!(path = %catalog_path, entries = catalog.len(), "Loaded existing catalog");
                catalog
            }
            CatalogLoad::Absent => {
                tracing::debug!(path = %catalog_path, "No existing catalog; starting empty");
                Catalog::new()
            }
            CatalogLoad::Malformed { reason } => {
                tracing::warn!(
                    path = %catalog_path,
                    %reason,
                    "Existing catalog is malformed; it will be replaced"
                );
                Catalog::new()
            }
        };

        let archiver = Archiver::new(&config.out_dir, &config.public_base);
        Ok(Self {
            config,
            archiver,
            catalog,
            report: BuildReport::default(),
        })
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Materialize `reference` and fold its packages into the catalog.
    ///
    /// Checkout failures follow the configured [`CheckoutPolicy`]; archive
    /// failures are always returned.
    pub fn process_reference<S>(&mut self, source: &S, reference: &Reference) -> Result<()>
    where
        S: RefSource + ?Sized,
    {
        tracing::info!(
            reference = %reference.name,
            version = %reference.version_label,
            commit = %reference.commit_hash,
            "Processing reference"
        );

        let snapshot = match source.materialize(reference) {
            Ok(snapshot) => snapshot,
            Err(e) => match self.config.checkout_policy {
                CheckoutPolicy::Abort => return Err(e.into()),
                CheckoutPolicy::Skip => {
                    tracing::warn!(reference = %reference.name, error = %e, "Skipping reference");
                    self.report.refs_skipped += 1;
                    return Ok(());
                }
            },
        };

        self.process_snapshot(&snapshot)?;
        self.report.refs_processed += 1;
        Ok(())
    }

    /// Archive and record every package found in `snapshot`.
    pub fn process_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        let reference = snapshot.reference();
        let locator = ManifestLocator::new(snapshot.root(), self.config.manifest_name.as_str());

        for path in locator.iter() {
            let manifest = match Manifest::load(&path) {
                ManifestLoad::Loaded(manifest) => manifest,
                skipped => {
                    tracing::debug!(
                        path = %path.display(),
                        reason = %skipped.skip_reason().unwrap_or_default(),
                        "Skipping manifest"
                    );
                    self.report.manifests_skipped += 1;
                    continue;
                }
            };

            let outcome =
                self.archiver
                    .ensure(manifest.root(), manifest.name(), &reference.commit_hash)?;
            match outcome.status {
                ArchiveStatus::Built { .. } => self.report.archives_built += 1,
                ArchiveStatus::Reused => self.report.archives_reused += 1,
            }

            self.catalog
                .upsert(&manifest, &reference.version_label, &outcome.dist);
            self.report.entries_written += 1;
        }

        Ok(())
    }

    /// Save the catalog and return the run's counters.
    pub fn finish(self) -> Result<BuildReport> {
        self.catalog.save(&self.config.catalog_path())?;
        tracing::info!(
            path = %self.config.catalog_path(),
            entries = self.catalog.len(),
            "Catalog written"
        );
        Ok(self.report)
    }
}

/// Build archives and the catalog for every tag and remote branch of `source`.
pub fn build<S>(source: &S, config: &BuildConfig) -> Result<BuildReport>
where
    S: RefSource + ?Sized,
{
    let mut pipeline = BuildPipeline::new(config.clone())?;

    let references = source.references()?;
    tracing::info!(count = references.len(), "Enumerated references");

    for reference in &references {
        pipeline.process_reference(source, reference)?;
    }

    pipeline.finish()
}
