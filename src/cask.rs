// SPDX-License-Identifier: MPL-2.0

//! Cask descriptor data model and shallow cask materialization (§4.15).
//!
//! The cask installer is acknowledged but not specified in depth: only
//! `App`/`Binary` artifacts are materialized; `Pkg`/`Uninstall` entries
//! are recorded for `info`/`list` but never executed.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;

use crate::paths::Layout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaskDescriptor {
    pub token: String,
    pub name: Vec<String>,
    pub version: String,
    pub url: String,
    pub sha256: Sha256Check,
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sha256Check {
    Hash(String),
    NoCheck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    App { target: String },
    Binary { target: String, symlink: Option<String> },
    Pkg { target: String },
    Uninstall { description: String },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Copy `App`/`Binary` artifacts out of an extracted cask payload into
/// `Caskroom/<token>/<version>/` and link binaries into the prefix.
pub fn materialize(layout: &Layout, cask: &CaskDescriptor, payload_root: &Path) -> Result<(), Error> {
    let dest = layout.caskroom_dir().join(&cask.token).join(&cask.version);
    fs::create_dir_all(&dest)?;

    for artifact in &cask.artifacts {
        match artifact {
            Artifact::App { target } | Artifact::Binary { target, symlink: None } => {
                let src = payload_root.join(target);
                let dst = dest.join(target);
                if src.is_dir() {
                    copy_dir(&src, &dst)?;
                } else if src.is_file() {
                    if let Some(parent) = dst.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::copy(&src, &dst)?;
                }
            }
            Artifact::Binary { target, symlink: Some(link_name) } => {
                let src = payload_root.join(target);
                let dst = dest.join(target);
                if let Some(parent) = dst.parent() {
                    fs::create_dir_all(parent)?;
                }
                if src.is_file() {
                    fs::copy(&src, &dst)?;
                }
                let bin_link = layout.bin_dir().join(link_name);
                let _ = fs::remove_file(&bin_link);
                symlink(&dst, &bin_link)?;
            }
            // Not executed: no elevated installer invocation, no uninstall scripting.
            Artifact::Pkg { .. } | Artifact::Uninstall { .. } => {}
        }
    }

    Ok(())
}

fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let dst_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dst_path)?;
        } else {
            fs::copy(entry.path(), dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pkg_and_uninstall_artifacts_are_inert() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();
        let payload = tempfile::tempdir().unwrap();

        let cask = CaskDescriptor {
            token: "some-app".into(),
            name: vec!["Some App".into()],
            version: "1.0".into(),
            url: "https://example.test/x.dmg".into(),
            sha256: Sha256Check::NoCheck,
            artifacts: vec![
                Artifact::Pkg { target: "installer.pkg".into() },
                Artifact::Uninstall { description: "quit app".into() },
            ],
        };

        materialize(&layout, &cask, payload.path()).unwrap();
        let dest = layout.caskroom_dir().join("some-app").join("1.0");
        assert!(dest.is_dir());
        // No pkg file was created/executed.
        assert!(!dest.join("installer.pkg").exists());
    }
}
