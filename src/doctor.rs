// SPDX-License-Identifier: MPL-2.0

//! `doctor`: diagnose divergence between the state database and the
//! on-disk Cellar/bin tree. Purely read-only — it reports, it never
//! repairs (§7: a `DBError` means installed files may be on disk
//! without a record, and this is how a user finds out).

use std::fs;

use crate::db::Database;
use crate::paths::Layout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// A database record has no matching keg directory on disk.
    MissingKeg { name: String, version: String },
    /// A Cellar entry has no corresponding database record.
    UntrackedKeg { name: String, version: String },
    /// A `prefix/bin` symlink claims to point into the Cellar but its
    /// target isn't a regular file (P4).
    BrokenBinLink { path: std::path::PathBuf },
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Issue::MissingKeg { name, version } => {
                write!(f, "{name} {version} is recorded as installed but its Cellar directory is missing")
            }
            Issue::UntrackedKeg { name, version } => {
                write!(f, "{name} {version} has a Cellar directory but no database record")
            }
            Issue::BrokenBinLink { path } => {
                write!(f, "{} points into the Cellar but does not resolve to a regular file", path.display())
            }
        }
    }
}

pub fn run(layout: &Layout, db: &Database) -> Vec<Issue> {
    let mut issues = Vec::new();

    for keg in db.list() {
        if !layout.keg_dir(&keg.name, &keg.version).is_dir() {
            issues.push(Issue::MissingKeg { name: keg.name.clone(), version: keg.version.clone() });
        }
    }

    let cellar = layout.cellar_dir();
    if let Ok(packages) = fs::read_dir(&cellar) {
        for package_entry in packages.flatten() {
            let Ok(file_type) = package_entry.file_type() else { continue };
            if !file_type.is_dir() {
                continue;
            }
            let name = package_entry.file_name().to_string_lossy().into_owned();

            let Ok(versions) = fs::read_dir(package_entry.path()) else { continue };
            for version_entry in versions.flatten() {
                if !version_entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    continue;
                }
                let version = version_entry.file_name().to_string_lossy().into_owned();
                if db.find(&name).map(|k| &k.version) != Some(&version) {
                    issues.push(Issue::UntrackedKeg { name: name.clone(), version });
                }
            }
        }
    }

    for bin_dir in [layout.bin_dir(), layout.sbin_dir()] {
        let Ok(entries) = fs::read_dir(&bin_dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(target) = fs::read_link(&path) else { continue };
            if target.starts_with(&cellar) && !target.is_file() {
                issues.push(Issue::BrokenBinLink { path });
            }
        }
    }

    issues
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clean_install_reports_no_issues() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();

        let keg = layout.keg_dir("tree", "2.1.1");
        fs::create_dir_all(keg.join("bin")).unwrap();
        fs::write(keg.join("bin/tree"), b"x").unwrap();

        let mut db = Database::open(&layout).unwrap();
        db.record_install("tree", "2.1.1", &"a".repeat(64), 1).unwrap();

        assert!(run(&layout, &db).is_empty());
    }

    #[test]
    fn record_without_keg_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();

        let mut db = Database::open(&layout).unwrap();
        db.record_install("ghost", "1.0", &"a".repeat(64), 1).unwrap();

        let issues = run(&layout, &db);
        assert!(issues.contains(&Issue::MissingKeg { name: "ghost".into(), version: "1.0".into() }));
    }

    #[test]
    fn keg_without_record_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();
        fs::create_dir_all(layout.keg_dir("orphan", "1.0")).unwrap();

        let db = Database::open(&layout).unwrap();
        let issues = run(&layout, &db);
        assert!(issues.contains(&Issue::UntrackedKeg { name: "orphan".into(), version: "1.0".into() }));
    }
}
