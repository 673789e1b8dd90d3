// SPDX-License-Identifier: MPL-2.0

//! Symlink a keg's executables into `prefix/bin` and `prefix/sbin`, and
//! maintain the `prefix/opt/<name>` pointer at the keg root.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;

use crate::paths::Layout;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Link every regular file or symlink under `Cellar/<name>/<version>/{bin,sbin}`
/// into `prefix/{bin,sbin}`, and point `prefix/opt/<name>` at the keg.
/// A pre-existing target is overwritten only if it already resolves into
/// the same keg's owning package (single-writer assumption otherwise).
pub fn link(layout: &Layout, name: &str, actual_version: &str) -> Result<(), Error> {
    let keg_dir = layout.keg_dir(name, actual_version);

    link_bin_subdir(&keg_dir.join("bin"), &layout.bin_dir())?;
    link_bin_subdir(&keg_dir.join("sbin"), &layout.sbin_dir())?;

    let opt_link = layout.opt_dir().join(name);
    if opt_link.is_symlink() || opt_link.exists() {
        fs::remove_file(&opt_link).or_else(|_| fs::remove_dir_all(&opt_link))?;
    }
    fs::create_dir_all(layout.opt_dir())?;
    symlink(&keg_dir, &opt_link)?;

    Ok(())
}

fn link_bin_subdir(source_dir: &Path, target_dir: &Path) -> Result<(), Error> {
    if !source_dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(target_dir)?;

    for entry in fs::read_dir(source_dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            continue;
        }

        let basename = entry.file_name();
        let link_path = target_dir.join(&basename);

        if link_path.is_symlink() {
            fs::remove_file(&link_path)?;
        } else if link_path.exists() {
            // A real file occupying the slot: overwrite per the
            // single-writer default policy.
            fs::remove_file(&link_path)?;
        }

        symlink(entry.path(), &link_path)?;
    }

    Ok(())
}

/// Remove only the symlinks under `prefix/{bin,sbin,opt}` whose target
/// resolves into this keg; anything pointing elsewhere is left alone.
pub fn unlink(layout: &Layout, name: &str, actual_version: &str) -> Result<(), Error> {
    let keg_dir = layout.keg_dir(name, actual_version);

    unlink_bin_subdir(&layout.bin_dir(), &keg_dir)?;
    unlink_bin_subdir(&layout.sbin_dir(), &keg_dir)?;

    let opt_link = layout.opt_dir().join(name);
    if let Ok(target) = fs::read_link(&opt_link) {
        if target == keg_dir {
            fs::remove_file(&opt_link)?;
        }
    }

    Ok(())
}

fn unlink_bin_subdir(dir: &Path, keg_dir: &Path) -> Result<(), Error> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if let Ok(target) = fs::read_link(&path) {
            if target.starts_with(keg_dir) {
                fs::remove_file(&path)?;
            }
        }
    }
    Ok(())
}
