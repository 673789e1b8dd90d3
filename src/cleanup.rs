// SPDX-License-Identifier: MPL-2.0

//! Garbage-collect orphaned blobs and store entries (P5, P6, S6).
//!
//! A blob or store entry is reachable if its hash is the `sha256` of an
//! active install record, an active record's history, or (unless
//! `--all`) a removed-but-retained record's history — see
//! [`crate::db::Database::list_removed`].

use std::collections::HashSet;
use std::fs;

use crate::db::Database;
use crate::paths::Layout;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    pub removed_blobs: Vec<String>,
    pub removed_store_entries: Vec<String>,
    pub dry_run: bool,
}

/// Compute the reachable-hash set and sweep `cache/blobs` and `store`
/// for anything not in it. `dry_run` computes the same report without
/// touching the filesystem (P5). `all` drops the removed-record
/// protection, per P6's explicit "(without --all)" scoping.
pub fn cleanup(layout: &Layout, db: &Database, dry_run: bool, all: bool) -> Result<Report, Error> {
    let reachable = reachable_hashes(db, all);
    let mut report = Report { dry_run, ..Report::default() };

    if let Ok(entries) = fs::read_dir(layout.blobs_dir()) {
        for entry in entries.flatten() {
            let sha = entry.file_name().to_string_lossy().into_owned();
            if reachable.contains(&sha) {
                continue;
            }
            if !dry_run {
                fs::remove_file(entry.path())?;
            }
            report.removed_blobs.push(sha);
        }
    }

    if let Ok(entries) = fs::read_dir(layout.store_dir()) {
        for entry in entries.flatten() {
            let sha = entry.file_name().to_string_lossy().into_owned();
            if reachable.contains(&sha) {
                continue;
            }
            if !dry_run {
                fs::remove_dir_all(entry.path())?;
            }
            report.removed_store_entries.push(sha);
        }
    }

    Ok(report)
}

fn reachable_hashes(db: &Database, all: bool) -> HashSet<String> {
    let mut reachable = HashSet::new();

    for keg in db.list() {
        reachable.insert(keg.sha256.clone());
        if !all {
            reachable.extend(keg.history.iter().map(|h| h.sha256.clone()));
        }
    }

    if !all {
        for keg in db.list_removed() {
            reachable.insert(keg.sha256.clone());
            reachable.extend(keg.history.iter().map(|h| h.sha256.clone()));
        }
    }

    reachable
}
