// SPDX-License-Identifier: MPL-2.0

//! Clone a store entry into the Cellar: COW clone → hardlink fan-out →
//! byte copy, in that preference order per platform.

use std::fs;
use std::io;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::paths::Layout;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no store entry found for {name} matching version {version}")]
    VersionNotFound { name: String, version: String },
    #[error("all clone strategies failed: {0}")]
    AllStrategiesFailed(#[source] io::Error),
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// Materialize `sha`'s store entry as `Cellar/<name>/<actual_version>/`,
/// returning the discovered `actual_version` (which may carry a rebuild
/// suffix the metadata never reported).
pub fn materialize(layout: &Layout, sha256: &str, name: &str, version: &str) -> Result<String, Error> {
    let probe_root = layout.store_entry(sha256).join(name);
    let actual_version = discover_actual_version(&probe_root, version)?;
    let src = probe_root.join(&actual_version);

    let cellar_name_dir = layout.cellar_dir().join(name);
    fs::create_dir_all(&cellar_name_dir)?;

    let keg_dir = cellar_name_dir.join(&actual_version);
    if keg_dir.exists() {
        fs::remove_dir_all(&keg_dir)?;
    }

    clone_tree(&src, &keg_dir)?;

    Ok(actual_version)
}

/// Report the already-materialized keg version matching `version`'s
/// prefix rule, if `Cellar/<name>/` already holds one — the orchestrator
/// uses this to skip packages that are already up to date (§4.12 step 2).
pub fn already_materialized(layout: &Layout, name: &str, version: &str) -> Option<String> {
    discover_actual_version(&layout.cellar_dir().join(name), version).ok()
}

/// Archives embed a top-level `<name>/<version_dir>` directory;
/// `actual_version` may equal `version` or be `version` plus a
/// `_<rebuild>` suffix the metadata never reported.
fn discover_actual_version(probe_root: &Path, version: &str) -> Result<String, Error> {
    let name = probe_root.file_name().unwrap_or_default().to_string_lossy().to_string();
    let not_found = || Error::VersionNotFound { name: name.clone(), version: version.to_string() };

    let entries = fs::read_dir(probe_root).map_err(|_| not_found())?;
    let prefix_with_rebuild = format!("{version}_");

    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().to_string();
        if dir_name == version || dir_name.starts_with(&prefix_with_rebuild) {
            return Ok(dir_name);
        }
    }

    Err(not_found())
}

/// COW clone, falling back to hardlink fan-out, falling back to a byte
/// copy. Every strategy that's attempted and fails is logged; only
/// exhausting all three is a hard error.
fn clone_tree(src: &Path, dst: &Path) -> Result<(), Error> {
    if try_cow_clone(src, dst).is_ok() {
        return Ok(());
    }
    log::debug!("COW clone unavailable for {src:?}, falling back to hardlinks");

    if try_hardlink_fanout(src, dst).is_ok() {
        return Ok(());
    }
    log::debug!("hardlink fan-out failed for {src:?}, falling back to byte copy");

    // Clean up any partial hardlink tree before the final attempt.
    let _ = fs::remove_dir_all(dst);
    copy_tree(src, dst).map_err(Error::AllStrategiesFailed)
}

#[cfg(target_os = "macos")]
fn try_cow_clone(src: &Path, dst: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let src_c = CString::new(src.as_os_str().as_bytes())?;
    let dst_c = CString::new(dst.as_os_str().as_bytes())?;

    // SAFETY: clonefile(2) takes two NUL-terminated paths and a flags word.
    let result = unsafe { libc::clonefile(src_c.as_ptr(), dst_c.as_ptr(), 0) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "macos"))]
fn try_cow_clone(src: &Path, dst: &Path) -> io::Result<()> {
    // btrfs/xfs reflink would be FICLONE per-file; without a portable
    // syscall wrapper here we treat reflink as unavailable and fall
    // through to hardlinking, which is still near-free on the same fs.
    let _ = (src, dst);
    Err(io::Error::new(io::ErrorKind::Unsupported, "reflink not attempted on this platform"))
}

/// Recursively hardlink regular files, recreate directories, and
/// recreate symlinks by reading their targets.
fn try_hardlink_fanout(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            try_hardlink_fanout(&src_path, &dst_path)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&src_path)?;
            symlink(target, &dst_path)?;
        } else {
            fs::hard_link(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            copy_tree(&src_path, &dst_path)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&src_path)?;
            symlink(target, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
            let mode = fs::metadata(&src_path)?.permissions().mode();
            fs::set_permissions(&dst_path, fs::Permissions::from_mode(mode))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn seed_store_entry(layout: &Layout, sha: &str, name: &str, dir_name: &str) -> PathBuf {
        let root = layout.store_entry(sha).join(name).join(dir_name);
        fs::create_dir_all(root.join("bin")).unwrap();
        fs::write(root.join("bin").join(name), b"#!/bin/sh\necho hi\n").unwrap();
        root
    }

    #[test]
    fn materialize_discovers_exact_version() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();
        seed_store_entry(&layout, "sha1", "tree", "2.1.1");

        let actual = materialize(&layout, "sha1", "tree", "2.1.1").unwrap();
        assert_eq!(actual, "2.1.1");
        assert!(layout.keg_dir("tree", "2.1.1").join("bin/tree").is_file());
    }

    #[test]
    fn materialize_discovers_rebuild_suffixed_version() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();
        seed_store_entry(&layout, "sha2", "ffmpeg", "7.0_2");

        let actual = materialize(&layout, "sha2", "ffmpeg", "7.0").unwrap();
        assert_eq!(actual, "7.0_2");
    }

    #[test]
    fn materialize_is_idempotent_replace() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();
        seed_store_entry(&layout, "sha3", "jq", "1.7");

        materialize(&layout, "sha3", "jq", "1.7").unwrap();
        // Re-running must atomically replace, not fail on pre-existing dir.
        materialize(&layout, "sha3", "jq", "1.7").unwrap();
        assert!(layout.keg_dir("jq", "1.7").join("bin/jq").is_file());
    }

    #[test]
    fn unmatched_version_errors() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();
        seed_store_entry(&layout, "sha4", "wget", "1.21");

        let err = materialize(&layout, "sha4", "wget", "2.0").unwrap_err();
        assert!(matches!(err, Error::VersionNotFound { .. }));
    }
}
