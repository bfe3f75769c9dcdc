//! End-to-end tests for the full build
//!
//! Each test creates a real source repository, clones it the way the binary
//! does and runs the pipeline into a temporary output directory.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use pretty_assertions::assert_eq;
use satis_core::{BuildConfig, BuildReport, Catalog, build};
use satis_fs::NormalizedPath;
use satis_git::ClonedRepository;
use satis_test_utils::SourceRepo;
use serde_json::json;
use tempfile::TempDir;
use zip::ZipArchive;

const PUBLIC: &str = "https://pkg.example.com";

fn run(source: &SourceRepo, out: &Path) -> BuildReport {
    let cloned = ClonedRepository::clone_from(&source.uri()).unwrap();
    build(&cloned, &BuildConfig::new(NormalizedPath::new(out), PUBLIC)).unwrap()
}

fn catalog(out: &Path) -> Catalog {
    Catalog::load(&NormalizedPath::new(out).join("packages.json")).into_catalog()
}

fn zip_entries(path: &Path) -> BTreeSet<String> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

#[test]
fn test_tags_and_branches_are_published() {
    let source = SourceRepo::new();
    source.write_manifest("", &json!({"name": "acme/widget"}));
    source.write("src/Widget.php", "<?php // 1.0");
    let first = source.commit("Release 1.0");
    source.tag("v1.0.0");

    source.write("src/Widget.php", "<?php // 1.1");
    let second = source.commit("Release 1.1");
    source.annotated_tag("v1.1.0");
    source.branch("feature-x");

    let out = TempDir::new().unwrap();
    let report = run(&source, out.path());

    assert_eq!(report.refs_processed, 4);
    assert_eq!(report.archives_built, 2);
    assert_eq!(report.archives_reused, 2);
    assert_eq!(report.entries_written, 4);

    let catalog = catalog(out.path());
    assert_eq!(
        catalog.versions("acme/widget"),
        vec!["dev-feature-x", "dev-main", "v1.0.0", "v1.1.0"]
    );
    assert_eq!(
        catalog.entry("acme/widget", "v1.0.0").unwrap()["dist"]["url"],
        json!(format!("{PUBLIC}/dist/acme/widget-{first}.zip"))
    );
    assert_eq!(
        catalog.entry("acme/widget", "dev-main").unwrap()["dist"]["url"],
        json!(format!("{PUBLIC}/dist/acme/widget-{second}.zip"))
    );
}

#[test]
fn test_each_version_archives_its_own_tree() {
    let source = SourceRepo::new();
    source.write_manifest("", &json!({"name": "acme/widget"}));
    source.write("src/Legacy.php", "<?php");
    let old = source.commit("Old layout");
    source.tag("v1.0.0");

    source.remove("src/Legacy.php");
    source.write("src/Modern.php", "<?php");
    let new = source.commit("New layout");
    source.tag("v2.0.0");

    let out = TempDir::new().unwrap();
    run(&source, out.path());

    let dist = out.path().join("dist/acme");
    assert_eq!(
        zip_entries(&dist.join(format!("widget-{old}.zip"))),
        BTreeSet::from(["composer.json".to_string(), "src/Legacy.php".to_string()])
    );
    assert_eq!(
        zip_entries(&dist.join(format!("widget-{new}.zip"))),
        BTreeSet::from(["composer.json".to_string(), "src/Modern.php".to_string()])
    );
}

#[test]
fn test_monorepo_packages_are_archived_from_their_own_root() {
    let source = SourceRepo::new();
    source.write_manifest("", &json!({"name": "acme/monorepo"}));
    source.write_manifest("packages/http", &json!({"name": "acme/http"}));
    source.write("packages/http/src/Client.php", "<?php");
    source.write_manifest("packages/cache", &json!({"name": "cache"}));
    let commit = source.commit("Monorepo");
    source.tag("v3.0.0");

    let out = TempDir::new().unwrap();
    run(&source, out.path());

    let catalog = catalog(out.path());
    assert_eq!(
        catalog.package_names(),
        vec!["acme/http", "acme/monorepo", "cache"]
    );
    assert!(catalog.entry("cache", "v3.0.0").is_some());

    assert_eq!(
        zip_entries(&out.path().join(format!("dist/acme/http-{commit}.zip"))),
        BTreeSet::from(["composer.json".to_string(), "src/Client.php".to_string()])
    );
    assert!(out.path().join(format!("dist/cache-{commit}.zip")).is_file());

    let root_entries = zip_entries(&out.path().join(format!("dist/acme/monorepo-{commit}.zip")));
    assert!(root_entries.contains("packages/http/src/Client.php"));
    assert!(!root_entries.iter().any(|name| name.starts_with(".git")));
}

#[test]
fn test_deleted_tags_stay_in_catalog() {
    let source = SourceRepo::new();
    source.write_manifest("", &json!({"name": "acme/widget"}));
    source.commit("Release 1.0");
    source.tag("v1.0.0");

    let out = TempDir::new().unwrap();
    run(&source, out.path());

    source.repository().tag_delete("v1.0.0").unwrap();
    source.write("CHANGELOG.md", "2.0");
    source.commit("Release 2.0");
    source.tag("v2.0.0");
    run(&source, out.path());

    assert_eq!(
        catalog(out.path()).versions("acme/widget"),
        vec!["dev-main", "v1.0.0", "v2.0.0"]
    );
}

#[test]
fn test_rerun_reuses_every_archive() {
    let source = SourceRepo::new();
    source.write_manifest("", &json!({"name": "acme/widget"}));
    source.commit("Release");
    source.tag("v1.0.0");

    let out = TempDir::new().unwrap();
    let first = run(&source, out.path());
    let second = run(&source, out.path());

    assert_eq!(first.archives_built, 1);
    assert_eq!(second.archives_built, 0);
    assert_eq!(second.archives_reused, 2);
    assert_eq!(catalog(out.path()).len(), 2);
}

#[test]
fn test_repository_without_manifests_writes_empty_catalog() {
    let source = SourceRepo::new();
    source.write("README.md", "not a package");
    source.commit("Docs only");
    source.tag("v0.1.0");

    let out = TempDir::new().unwrap();
    let report = run(&source, out.path());

    assert_eq!(report.entries_written, 0);
    assert!(catalog(out.path()).is_empty());
    assert!(!out.path().join("dist").exists());
}
