use std::fs;

use satis_git::{ClonedRepository, Error, RefSource, Reference};
use satis_test_utils::SourceRepo;
use serde_json::json;

fn tagged_source() -> SourceRepo {
    let source = SourceRepo::new();
    source.write_manifest("", &json!({"name": "acme/widget"}));
    source.write("src/Widget.php", "<?php // v1");
    source.write("packages/extra/composer.json", r#"{"name": "acme/extra"}"#);
    source.commit("First release");
    source.tag("v1.0.0");

    source.write("src/Widget.php", "<?php // v2");
    source.remove("packages");
    source.commit("Second release");
    source.tag("v2.0.0");
    source
}

fn tag<'a>(refs: &'a [Reference], name: &str) -> &'a Reference {
    refs.iter().find(|r| r.name == name).unwrap()
}

#[test]
fn test_materialize_writes_commit_tree() {
    let source = tagged_source();
    let cloned = ClonedRepository::clone_from(&source.uri()).unwrap();
    let tags = cloned.tags().unwrap();

    let snapshot = cloned.materialize(tag(&tags, "v1.0.0")).unwrap();

    let root = snapshot.root();
    assert_eq!(
        fs::read_to_string(root.join("src/Widget.php")).unwrap(),
        "<?php // v1"
    );
    assert!(root.join("composer.json").is_file());
    assert!(root.join("packages/extra/composer.json").is_file());
    assert!(!root.join(".git").exists());
}

#[test]
fn test_snapshots_are_independent() {
    let source = tagged_source();
    let cloned = ClonedRepository::clone_from(&source.uri()).unwrap();
    let tags = cloned.tags().unwrap();

    let old = cloned.materialize(tag(&tags, "v1.0.0")).unwrap();
    let new = cloned.materialize(tag(&tags, "v2.0.0")).unwrap();

    assert_ne!(old.root(), new.root());
    assert_eq!(
        fs::read_to_string(old.root().join("src/Widget.php")).unwrap(),
        "<?php // v1"
    );
    assert_eq!(
        fs::read_to_string(new.root().join("src/Widget.php")).unwrap(),
        "<?php // v2"
    );
    assert!(!new.root().join("packages").exists());
    assert_eq!(new.reference().name, "v2.0.0");
}

#[test]
fn test_snapshot_removed_on_drop() {
    let source = tagged_source();
    let cloned = ClonedRepository::clone_from(&source.uri()).unwrap();
    let tags = cloned.tags().unwrap();

    let snapshot = cloned.materialize(tag(&tags, "v1.0.0")).unwrap();
    let root = snapshot.root().to_path_buf();
    drop(snapshot);

    assert!(!root.exists());
}

#[test]
fn test_materialize_unknown_commit_fails() {
    let source = tagged_source();
    let cloned = ClonedRepository::clone_from(&source.uri()).unwrap();
    let bogus = Reference::tag("v9.9.9", "0123456789abcdef0123456789abcdef01234567");

    let err = cloned.materialize(&bogus).unwrap_err();

    assert!(matches!(err, Error::CheckoutFailed { ref reference, .. } if reference == "v9.9.9"));
}

#[test]
fn test_materialize_malformed_hash_fails() {
    let source = tagged_source();
    let cloned = ClonedRepository::clone_from(&source.uri()).unwrap();
    let bogus = Reference::tag("broken", "not-a-hash");

    assert!(cloned.materialize(&bogus).is_err());
}

#[cfg(unix)]
#[test]
fn test_materialize_preserves_modes_and_links() {
    use std::os::unix::fs::PermissionsExt;

    let source = SourceRepo::new();
    let script = source.write("bin/run", "#!/bin/sh\necho hi\n");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    source.symlink("bin/alias", "run");
    source.commit("Scripts");
    source.tag("v1.0.0");

    let cloned = ClonedRepository::clone_from(&source.uri()).unwrap();
    let tags = cloned.tags().unwrap();
    let snapshot = cloned.materialize(&tags[0]).unwrap();

    let mode = fs::metadata(snapshot.root().join("bin/run"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o111, 0o111);

    let link = snapshot.root().join("bin/alias");
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&link).unwrap().to_str(), Some("run"));
}

#[test]
fn test_materialize_applies_gitattributes_filters() {
    let source = SourceRepo::new();
    source.write(".gitattributes", "*.txt text eol=crlf\n");
    source.write("notes/a.txt", "one\ntwo\n");
    source.write("bin/raw.dat", "one\ntwo\n");
    source.commit("Line endings");
    source.tag("v1.0.0");

    let cloned = ClonedRepository::clone_from(&source.uri()).unwrap();
    let tags = cloned.tags().unwrap();
    let snapshot = cloned.materialize(&tags[0]).unwrap();

    assert_eq!(
        fs::read(snapshot.root().join("notes/a.txt")).unwrap(),
        b"one\r\ntwo\r\n"
    );
    assert_eq!(
        fs::read(snapshot.root().join("bin/raw.dat")).unwrap(),
        b"one\ntwo\n"
    );
}

#[test]
fn test_gitattributes_follow_the_materialized_tree() {
    let source = SourceRepo::new();
    source.write("a.txt", "one\ntwo\n");
    source.commit("Plain");
    source.tag("v1.0.0");
    source.write(".gitattributes", "*.txt text eol=crlf\n");
    source.commit("Line endings");
    source.tag("v2.0.0");

    let cloned = ClonedRepository::clone_from(&source.uri()).unwrap();
    let tags = cloned.tags().unwrap();

    let plain = cloned.materialize(tag(&tags, "v1.0.0")).unwrap();
    let crlf = cloned.materialize(tag(&tags, "v2.0.0")).unwrap();

    assert_eq!(fs::read(plain.root().join("a.txt")).unwrap(), b"one\ntwo\n");
    assert_eq!(fs::read(crlf.root().join("a.txt")).unwrap(), b"one\r\ntwo\r\n");
}

#[test]
fn test_clone_has_no_working_tree() {
    let source = tagged_source();
    let cloned = ClonedRepository::clone_from(&source.uri()).unwrap();

    assert!(!cloned.scratch_dir().join("repo/composer.json").exists());
    assert!(!cloned.scratch_dir().join("repo/src").exists());
}
