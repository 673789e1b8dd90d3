// SPDX-License-Identifier: MPL-2.0

//! Content-addressable directory store of extracted archives:
//! `store/<sha256>/`. A store entry is either absent or the complete
//! extraction of its blob — never partial.

use std::fs;
use std::path::Path;

use crate::extract;
use crate::paths::Layout;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("extract: {0}")]
    Extract(#[from] extract::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub fn has(layout: &Layout, sha256: &str) -> bool {
    layout.store_entry(sha256).is_dir()
}

/// No-op if the entry is already present; otherwise extracts
/// `blob_path` into a sibling temp directory and renames it into place,
/// so a reader never observes a partial store entry.
pub fn ensure(layout: &Layout, blob_path: &Path, sha256: &str) -> Result<(), Error> {
    if has(layout, sha256) {
        return Ok(());
    }

    let final_dir = layout.store_entry(sha256);
    let tmp_dir = layout.tmp_dir().join(format!("store-{sha256}-{}", std::process::id()));

    if tmp_dir.exists() {
        fs::remove_dir_all(&tmp_dir)?;
    }

    extract::extract(blob_path, &tmp_dir)?;

    if let Some(parent) = final_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    // A racing second writer may have published `final_dir` first; that
    // is success, not a conflict, so tolerate the rename failing because
    // the destination already exists.
    match fs::rename(&tmp_dir, &final_dir) {
        Ok(()) => Ok(()),
        Err(_) if final_dir.is_dir() => {
            let _ = fs::remove_dir_all(&tmp_dir);
            Ok(())
        }
        Err(e) => Err(Error::Io(e)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *content).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn ensure_extracts_once_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();

        let blob = dir.path().join("archive.tar.gz");
        make_tar_gz(&blob, &[("tree/2.1.1/bin/tree", b"#!/bin/sh\n")]);

        ensure(&layout, &blob, "shaABC").unwrap();
        assert!(has(&layout, "shaABC"));
        assert!(layout.store_entry("shaABC").join("tree/2.1.1/bin/tree").is_file());

        // Second call is a no-op: no re-extraction, no error.
        ensure(&layout, &blob, "shaABC").unwrap();
    }

    #[test]
    fn missing_entry_reports_absent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();
        assert!(!has(&layout, "nope"));
    }
}
