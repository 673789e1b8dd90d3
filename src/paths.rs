// SPDX-License-Identifier: MPL-2.0

//! Canonical, absolute paths for the prefix / store / cache / db tree.
//!
//! Everything else in the crate consumes these by name rather than
//! building paths ad hoc, so the on-disk layout only lives in one place.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

const DEFAULT_ROOT: &str = "/opt/nanobrew";

/// Root-relative layout of a `nanobrew` installation.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Resolve the root directory: explicit override, else
    /// `NANOBREW_ROOT`, else the compiled-in default.
    pub fn resolve(root_override: Option<&str>) -> Self {
        let root = root_override
            .map(PathBuf::from)
            .or_else(|| env::var_os("NANOBREW_ROOT").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));

        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.cache_dir().join("blobs")
    }

    pub fn blob_path(&self, sha256: &str) -> PathBuf {
        self.blobs_dir().join(sha256)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.cache_dir().join("tmp")
    }

    pub fn api_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("api")
    }

    pub fn token_cache_dir(&self) -> PathBuf {
        self.cache_dir().join("tokens")
    }

    pub fn store_dir(&self) -> PathBuf {
        self.root.join("store")
    }

    pub fn store_entry(&self, sha256: &str) -> PathBuf {
        self.store_dir().join(sha256)
    }

    pub fn prefix_dir(&self) -> PathBuf {
        self.root.join("prefix")
    }

    pub fn cellar_dir(&self) -> PathBuf {
        self.prefix_dir().join("Cellar")
    }

    pub fn keg_dir(&self, name: &str, actual_version: &str) -> PathBuf {
        self.cellar_dir().join(name).join(actual_version)
    }

    pub fn caskroom_dir(&self) -> PathBuf {
        self.prefix_dir().join("Caskroom")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.prefix_dir().join("bin")
    }

    pub fn sbin_dir(&self) -> PathBuf {
        self.prefix_dir().join("sbin")
    }

    pub fn opt_dir(&self) -> PathBuf {
        self.prefix_dir().join("opt")
    }

    pub fn db_dir(&self) -> PathBuf {
        self.root.join("db")
    }

    pub fn state_db_path(&self) -> PathBuf {
        self.db_dir().join("state.json")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("etc").join("nanobrew")
    }

    /// Create the full directory tree. Idempotent.
    pub fn init(&self) -> io::Result<()> {
        for dir in [
            self.blobs_dir(),
            self.tmp_dir(),
            self.api_cache_dir(),
            self.token_cache_dir(),
            self.store_dir(),
            self.cellar_dir(),
            self.caskroom_dir(),
            self.bin_dir(),
            self.sbin_dir(),
            self.opt_dir(),
            self.db_dir(),
            self.locks_dir(),
            self.config_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Fail fast with a clear message if the tree hasn't been `init`'d.
    pub fn ensure_initialized(&self) -> Result<(), ConfigError> {
        for dir in [self.db_dir(), self.cache_dir(), self.store_dir(), self.prefix_dir()] {
            if !dir.is_dir() {
                return Err(ConfigError::NotInitialized(self.root.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("root {0:?} is not initialized, run `nanobrew init` first")]
    NotInitialized(PathBuf),
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_root_used_when_unset() {
        let layout = Layout { root: PathBuf::from(DEFAULT_ROOT) };
        assert_eq!(layout.blob_path("abc"), PathBuf::from("/opt/nanobrew/cache/blobs/abc"));
        assert_eq!(layout.keg_dir("tree", "2.1.1"), PathBuf::from("/opt/nanobrew/prefix/Cellar/tree/2.1.1"));
    }

    #[test]
    fn override_takes_precedence() {
        let layout = Layout::resolve(Some("/tmp/custom-root"));
        assert_eq!(layout.root(), Path::new("/tmp/custom-root"));
    }
}
