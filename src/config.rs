// SPDX-License-Identifier: MPL-2.0

//! Layered YAML configuration under `<root>/etc/nanobrew/`, merged
//! drop-in-before-base (mirroring `moss::config`'s admin-over-vendor
//! merge, collapsed to a single tier since [`Layout`] has no separate
//! vendor path — see DESIGN.md).

use std::fs::{self, File};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::paths::Layout;

const EXTENSION: &str = "conf";

/// A mergeable configuration domain, keyed by a file stem under
/// `etc/nanobrew/`.
pub trait Config: Default + DeserializeOwned {
    fn domain() -> &'static str;

    /// Fold `other` (read later, so higher priority) on top of `self`.
    fn merge(self, other: Self) -> Self;
}

/// Read every `<domain>.conf.d/*.conf` drop-in in filename order, then
/// `<domain>.conf` itself (highest priority), folding them together.
/// Missing files are silently skipped; a present-but-malformed file is
/// also skipped rather than treated as fatal, since a tunable's only
/// possible effect is suboptimal defaults, not incorrect installs.
pub fn load<T: Config>(layout: &Layout) -> T {
    let domain = T::domain();
    let dir = layout.config_dir();

    let mut paths: Vec<PathBuf> = fs::read_dir(dir.join(format!("{domain}.conf.d")))
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(EXTENSION))
                .collect()
        })
        .unwrap_or_default();
    paths.sort();
    paths.push(dir.join(format!("{domain}.{EXTENSION}")));

    paths
        .into_iter()
        .filter_map(|p| File::open(p).ok())
        .filter_map(|f| serde_yaml::from_reader(f).ok())
        .fold(T::default(), T::merge)
}

/// Persist `config` as `<domain>.conf` under `etc/nanobrew/`.
pub fn save<T: Config + Serialize>(layout: &Layout, config: &T) -> Result<(), SaveError> {
    let dir = layout.config_dir();
    fs::create_dir_all(&dir).map_err(SaveError::Io)?;
    let path = dir.join(format!("{}.{EXTENSION}", T::domain()));
    let serialized = serde_yaml::to_string(config)?;
    fs::write(&path, serialized).map_err(SaveError::Io)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("io: {0}")]
    Io(#[source] std::io::Error),
    #[error("failed to serialize config as yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The crate's one configuration domain: tunables called out by §9 as
/// "tuning parameters, not load-bearing invariants".
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    pub apt_mirror: Option<String>,
    pub apt_dist: Option<String>,
    pub apt_component: Option<String>,
    pub apt_arch: Option<String>,
    pub thread_pool_size: Option<usize>,
}

const DEFAULT_APT_MIRROR: &str = "http://archive.ubuntu.com/ubuntu";
const DEFAULT_APT_DIST: &str = "stable";
const DEFAULT_APT_COMPONENT: &str = "main";
const DEFAULT_APT_ARCH: &str = "amd64";

impl Settings {
    pub fn apt_mirror(&self) -> &str {
        self.apt_mirror.as_deref().unwrap_or(DEFAULT_APT_MIRROR)
    }

    pub fn apt_dist(&self) -> &str {
        self.apt_dist.as_deref().unwrap_or(DEFAULT_APT_DIST)
    }

    pub fn apt_component(&self) -> &str {
        self.apt_component.as_deref().unwrap_or(DEFAULT_APT_COMPONENT)
    }

    pub fn apt_arch(&self) -> &str {
        self.apt_arch.as_deref().unwrap_or(DEFAULT_APT_ARCH)
    }

    pub fn thread_pool_size(&self) -> Option<usize> {
        self.thread_pool_size
    }
}

impl Config for Settings {
    fn domain() -> &'static str {
        "nanobrew"
    }

    fn merge(self, other: Self) -> Self {
        Settings {
            apt_mirror: other.apt_mirror.or(self.apt_mirror),
            apt_dist: other.apt_dist.or(self.apt_dist),
            apt_component: other.apt_component.or(self.apt_component),
            apt_arch: other.apt_arch.or(self.apt_arch),
            thread_pool_size: other.thread_pool_size.or(self.thread_pool_size),
        }
    }
}
