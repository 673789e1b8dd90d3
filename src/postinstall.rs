// SPDX-License-Identifier: MPL-2.0

//! Best-effort post-install script runner (§4.14, §9 open question).
//!
//! Recognizes exactly three line-oriented constructs against the keg
//! root: `system <cmd> <args...>`, `mkdir_p <path>`, `ln_sf <target>
//! <link>`. Anything else is logged as a warning and skipped — this is
//! deliberately not a shell interpreter.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;
use std::process::Command;

use crate::descriptor::Descriptor;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Run `descriptor`'s post-install script, if any, against `keg_dir`.
/// A no-op when `post_install_defined` is false or no script text is
/// available. Per-line failures are logged and do not abort the rest
/// of the script.
pub fn run(descriptor: &Descriptor, keg_dir: &Path) -> Result<(), Error> {
    if !descriptor.post_install_defined {
        return Ok(());
    }
    let Some(script) = &descriptor.caveats else {
        return Ok(());
    };

    for line in script.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let outcome = if let Some(rest) = line.strip_prefix("system ") {
            run_system(keg_dir, rest)
        } else if let Some(rest) = line.strip_prefix("mkdir_p ") {
            run_mkdir_p(keg_dir, rest.trim())
        } else if let Some(rest) = line.strip_prefix("ln_sf ") {
            run_ln_sf(keg_dir, rest)
        } else {
            log::warn!("post_install({}): unrecognized construct, skipping: {line:?}", descriptor.name);
            continue;
        };

        if let Err(e) = outcome {
            log::warn!("post_install({}): {line:?} failed: {e}", descriptor.name);
        }
    }

    Ok(())
}

fn run_system(keg_dir: &Path, rest: &str) -> Result<(), Error> {
    let mut parts = rest.split_whitespace();
    let Some(cmd) = parts.next() else { return Ok(()) };
    Command::new(cmd).args(parts).current_dir(keg_dir).status()?;
    Ok(())
}

fn run_mkdir_p(keg_dir: &Path, path: &str) -> Result<(), Error> {
    fs::create_dir_all(keg_dir.join(path))?;
    Ok(())
}

fn run_ln_sf(keg_dir: &Path, rest: &str) -> Result<(), Error> {
    let mut parts = rest.split_whitespace();
    let (Some(target), Some(link)) = (parts.next(), parts.next()) else {
        return Ok(());
    };

    let link_path = keg_dir.join(link);
    if link_path.is_symlink() || link_path.exists() {
        fs::remove_file(&link_path)?;
    }
    if let Some(parent) = link_path.parent() {
        fs::create_dir_all(parent)?;
    }
    symlink(target, &link_path)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::descriptor::Artifact;

    fn descriptor(caveats: &str) -> Descriptor {
        Descriptor {
            name: "tree".into(),
            version: "2.1.1".into(),
            rebuild: 0,
            desc: String::new(),
            dependencies: vec![],
            artifact: Artifact::Binary { url: "https://example.test/x".into(), sha256: "a".repeat(64) },
            caveats: Some(caveats.to_string()),
            post_install_defined: true,
        }
    }

    #[test]
    fn mkdir_p_creates_directory_under_keg() {
        let dir = tempfile::tempdir().unwrap();
        run(&descriptor("mkdir_p var/log"), dir.path()).unwrap();
        assert!(dir.path().join("var/log").is_dir());
    }

    #[test]
    fn ln_sf_creates_forced_symlink() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("real"), b"x").unwrap();
        run(&descriptor("ln_sf real linked"), dir.path()).unwrap();
        assert_eq!(fs::read_link(dir.path().join("linked")).unwrap(), Path::new("real"));
    }

    #[test]
    fn unrecognized_construct_is_skipped_not_executed() {
        let dir = tempfile::tempdir().unwrap();
        run(&descriptor("rm -rf /"), dir.path()).unwrap();
        // Nothing should have happened; the directory is untouched.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn not_defined_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = descriptor("mkdir_p var/log");
        d.post_install_defined = false;
        run(&d, dir.path()).unwrap();
        assert!(!dir.path().join("var/log").exists());
    }
}
