// SPDX-License-Identifier: MPL-2.0

//! End-to-end tests driving the compiled `nanobrew` binary against a
//! throwaway `--root`, covering the boundary behaviors and scenarios
//! from the spec's testable-properties section that don't require
//! reaching a real package index (S1-style filesystem state is seeded
//! directly rather than downloaded).

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn nanobrew() -> Command {
    Command::cargo_bin("nanobrew").unwrap()
}

/// Seed a fully-materialized, linked keg plus its state-db record,
/// mirroring what a real `install` run would have left behind, so
/// DB-and-filesystem commands can be exercised without a network call.
fn seed_keg(root: &Path, name: &str, version: &str, sha256: &str, installed_at: i64) {
    let keg_bin = root.join("prefix/Cellar").join(name).join(version).join("bin");
    fs::create_dir_all(&keg_bin).unwrap();
    fs::write(keg_bin.join(name), b"#!/bin/sh\necho hi\n").unwrap();

    fs::create_dir_all(root.join("prefix/bin")).unwrap();
    #[cfg(unix)]
    std::os::unix::fs::symlink(keg_bin.join(name), root.join("prefix/bin").join(name)).unwrap();

    let state_path = root.join("db/state.json");
    let mut doc: serde_json::Value = if state_path.is_file() {
        serde_json::from_slice(&fs::read(&state_path).unwrap()).unwrap()
    } else {
        serde_json::json!({"kegs": [], "casks": []})
    };
    let kegs = doc["kegs"].as_array_mut().unwrap();
    kegs.retain(|k| k["name"] != name);
    kegs.push(serde_json::json!({
        "name": name,
        "version": version,
        "sha256": sha256,
        "pinned": false,
        "installed_at": installed_at,
        "history": [],
    }));
    fs::write(&state_path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
}

#[test]
fn init_creates_the_full_directory_tree() {
    let dir = tempfile::tempdir().unwrap();

    nanobrew().arg("--root").arg(dir.path()).arg("init").assert().success().stdout(predicate::str::contains("initialized"));

    for sub in ["cache/blobs", "cache/tmp", "cache/api", "cache/tokens", "store", "prefix/Cellar", "prefix/bin", "db", "locks"] {
        assert!(dir.path().join(sub).is_dir(), "missing {sub}");
    }
}

/// S1 (minus the network fetch): a keg seeded exactly as a real install
/// would leave it shows up in `list` with the right version, and its
/// `prefix/bin` symlink resolves into the Cellar.
#[test]
fn list_reports_a_seeded_keg_and_its_symlink_resolves() {
    let dir = tempfile::tempdir().unwrap();
    nanobrew().arg("--root").arg(dir.path()).arg("init").assert().success();

    let sha = "a".repeat(64);
    seed_keg(dir.path(), "tree", "2.1.1", &sha, 1_700_000_000);

    nanobrew()
        .arg("--root")
        .arg(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("tree 2.1.1"));

    let link = dir.path().join("prefix/bin/tree");
    assert!(link.is_symlink());
    let target = fs::read_link(&link).unwrap();
    assert!(target.starts_with(dir.path().join("prefix/Cellar/tree")));
    assert!(target.is_file());
}

#[test]
fn pin_then_list_shows_pinned_marker_and_unpin_clears_it() {
    let dir = tempfile::tempdir().unwrap();
    nanobrew().arg("--root").arg(dir.path()).arg("init").assert().success();
    seed_keg(dir.path(), "jq", "1.7", &"b".repeat(64), 1_700_000_000);

    nanobrew().arg("--root").arg(dir.path()).arg("pin").arg("jq").assert().success().stdout(predicate::str::contains("Pinned jq"));
    nanobrew().arg("--root").arg(dir.path()).arg("list").assert().success().stdout(predicate::str::contains("jq 1.7 [pinned]"));

    nanobrew().arg("--root").arg(dir.path()).arg("unpin").arg("jq").assert().success();
    nanobrew()
        .arg("--root")
        .arg(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("jq 1.7").and(predicate::str::contains("[pinned]").not()));
}

/// B4: rollback on a package with no history fails locally without
/// touching the database.
#[test]
fn rollback_with_empty_history_fails_locally_and_state_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    nanobrew().arg("--root").arg(dir.path()).arg("init").assert().success();
    seed_keg(dir.path(), "tree", "2.1.1", &"c".repeat(64), 1_700_000_000);

    let before = fs::read_to_string(dir.path().join("db/state.json")).unwrap();

    nanobrew()
        .arg("--root")
        .arg(dir.path())
        .arg("rollback")
        .arg("tree")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no prior version"));

    let after = fs::read_to_string(dir.path().join("db/state.json")).unwrap();
    assert_eq!(before, after);
}

/// S5-style rollback: seed a keg with one history entry directly in
/// state.json (as a prior `install` over an existing version would
/// have produced), then roll it back and confirm the active record and
/// its history swap, and the bin symlink repoints at the restored keg.
#[test]
fn rollback_restores_the_previous_version_and_relinks() {
    let dir = tempfile::tempdir().unwrap();
    nanobrew().arg("--root").arg(dir.path()).arg("init").assert().success();

    // Materialize both version directories so relinking has somewhere to point.
    for version in ["7.0", "7.1"] {
        let keg_bin = dir.path().join("prefix/Cellar/ffmpeg").join(version).join("bin");
        fs::create_dir_all(&keg_bin).unwrap();
        fs::write(keg_bin.join("ffmpeg"), b"#!/bin/sh\n").unwrap();
    }
    fs::write(
        dir.path().join("db/state.json"),
        serde_json::json!({
            "kegs": [{
                "name": "ffmpeg",
                "version": "7.1",
                "sha256": "d".repeat(64),
                "pinned": false,
                "installed_at": 2,
                "history": [{"version": "7.0", "sha256": "e".repeat(64), "installed_at": 1}],
            }],
            "casks": [],
        })
        .to_string(),
    )
    .unwrap();
    nanobrew()
        .arg("--root")
        .arg(dir.path())
        .arg("rollback")
        .arg("ffmpeg")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled back ffmpeg to 7.0"));

    nanobrew()
        .arg("--root")
        .arg(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg 7.0"));

    let link = dir.path().join("prefix/bin/ffmpeg");
    assert!(link.is_symlink());
    let target = fs::read_link(&link).unwrap();
    assert!(target.to_string_lossy().contains("/7.0/"));
}

/// P6 / S6: `cleanup` without `--all` must never remove a blob or store
/// entry still referenced by an active record or by a removed-but-
/// retained history entry; `--dry-run` makes no modifications at all (P5).
#[test]
fn cleanup_protects_referenced_blobs_and_dry_run_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    nanobrew().arg("--root").arg(dir.path()).arg("init").assert().success();

    let referenced_sha = "f".repeat(64);
    let orphan_sha = "0".repeat(64);
    fs::write(dir.path().join("cache/blobs").join(&referenced_sha), b"referenced").unwrap();
    fs::write(dir.path().join("cache/blobs").join(&orphan_sha), b"orphan").unwrap();
    fs::create_dir_all(dir.path().join("store").join(&referenced_sha)).unwrap();
    fs::create_dir_all(dir.path().join("store").join(&orphan_sha)).unwrap();

    seed_keg(dir.path(), "tree", "2.1.1", &referenced_sha, 1_700_000_000);

    // --dry-run: nothing on disk changes.
    nanobrew()
        .arg("--root")
        .arg(dir.path())
        .arg("cleanup")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Would remove blob").and(predicate::str::contains(orphan_sha.as_str())));
    assert!(dir.path().join("cache/blobs").join(&orphan_sha).is_file());
    assert!(dir.path().join("store").join(&orphan_sha).is_dir());

    // Real run: only the orphan goes, the referenced blob/store entry stay.
    nanobrew().arg("--root").arg(dir.path()).arg("cleanup").assert().success();
    assert!(!dir.path().join("cache/blobs").join(&orphan_sha).is_file());
    assert!(!dir.path().join("store").join(&orphan_sha).is_dir());
    assert!(dir.path().join("cache/blobs").join(&referenced_sha).is_file());
    assert!(dir.path().join("store").join(&referenced_sha).is_dir());
}

/// Commands that touch the tree before `init` must fail with a clear
/// configuration error rather than panicking or silently creating
/// partial state.
#[test]
fn uninitialized_root_is_a_fatal_config_error() {
    let dir = tempfile::tempdir().unwrap();
    nanobrew()
        .arg("--root")
        .arg(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn unknown_subcommand_exits_nonzero_with_a_usage_hint() {
    let dir = tempfile::tempdir().unwrap();
    nanobrew().arg("--root").arg(dir.path()).arg("frobnicate").assert().failure();
}

#[test]
fn doctor_flags_a_record_with_no_matching_cellar_directory() {
    let dir = tempfile::tempdir().unwrap();
    nanobrew().arg("--root").arg(dir.path()).arg("init").assert().success();

    // Record a keg in the DB without ever materializing its Cellar dir.
    fs::write(
        dir.path().join("db/state.json"),
        serde_json::json!({
            "kegs": [{
                "name": "ghost",
                "version": "1.0",
                "sha256": "1".repeat(64),
                "pinned": false,
                "installed_at": 1,
                "history": [],
            }],
            "casks": [],
        })
        .to_string(),
    )
    .unwrap();

    nanobrew()
        .arg("--root")
        .arg(dir.path())
        .arg("doctor")
        .assert()
        .failure()
        .stdout(predicate::str::contains("ghost"));
}

#[test]
fn completions_emits_a_nonempty_script_for_each_supported_shell() {
    let dir = tempfile::tempdir().unwrap();
    for shell in ["bash", "zsh", "fish"] {
        nanobrew()
            .arg("--root")
            .arg(dir.path())
            .arg("completions")
            .arg(shell)
            .assert()
            .success()
            .stdout(predicate::str::is_empty().not());
    }
}
