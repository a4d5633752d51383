//! `zero` and `clean` rewrite wrappers without touching the catalogs.

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const TAGGED: &str = "\
trice( iD( 999), \"msg:value=%d\\n\", -1 );
TRICE8_1( Id( 1000), \"v=%d\\n\", v );
TRICE( ID(0), \"boot\\n\" );
";

#[test]
fn zero_resets_every_id_and_keeps_the_variant() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("t.c").write_str(TAGGED).expect("write t.c");

    Command::cargo_bin("ttag")
        .expect("bin")
        .current_dir(tmp.path())
        .arg("zero")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 file(s) modified"));

    let out = std::fs::read_to_string(tmp.path().join("t.c")).unwrap();
    assert!(out.contains("trice( iD(0), \"msg:value=%d\\n\", -1 );"));
    assert!(out.contains("TRICE8_1( Id(0), \"v=%d\\n\", v );"));
    // Already-zero wrappers are normalized, not duplicated.
    assert!(out.contains("TRICE( ID(0), \"boot\\n\" );"));
}

#[test]
fn clean_removes_the_wrapper_entirely() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("t.c").write_str(TAGGED).expect("write t.c");

    Command::cargo_bin("ttag")
        .expect("bin")
        .current_dir(tmp.path())
        .arg("clean")
        .assert()
        .success();

    let out = std::fs::read_to_string(tmp.path().join("t.c")).unwrap();
    assert!(out.contains("trice( \"msg:value=%d\\n\", -1 );"));
    assert!(out.contains("TRICE8_1( \"v=%d\\n\", v );"));
    assert!(out.contains("TRICE( \"boot\\n\" );"));
    assert!(!out.contains("Id("));
    assert!(!out.contains("iD("));
}

#[test]
fn clean_then_update_retags_from_the_catalog_free_list() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("t.c").write_str(TAGGED).expect("write t.c");

    let bin = || {
        let mut c = Command::cargo_bin("ttag").expect("bin");
        c.current_dir(tmp.path());
        c
    };

    bin()
        .args(["update", "--strategy", "upward"])
        .assert()
        .success();
    let til_before = std::fs::read_to_string(tmp.path().join("til.json")).unwrap();

    bin().arg("clean").assert().success();
    // Catalogs are untouched by clean.
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("til.json")).unwrap(),
        til_before
    );

    bin()
        .args(["update", "--strategy", "upward"])
        .assert()
        .success();
    let out = std::fs::read_to_string(tmp.path().join("t.c")).unwrap();
    // Fresh wrappers allocate past the IDs still recorded in the catalog:
    // the first run kept 999 and 1000 and allocated 1001 for the zero site.
    assert!(out.contains("( iD( 1002)"));
    assert!(out.contains("TRICE8_1( ID( 1003)"));
}

#[test]
fn zero_dry_run_leaves_the_tree_alone() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child("t.c").write_str(TAGGED).expect("write t.c");

    Command::cargo_bin("ttag")
        .expect("bin")
        .current_dir(tmp.path())
        .args(["--dry-run", "zero"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry run, nothing written"));

    assert_eq!(
        std::fs::read_to_string(tmp.path().join("t.c")).unwrap(),
        TAGGED
    );
}
