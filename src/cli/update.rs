// SPDX-License-Identifier: MPL-2.0

//! `update`: refresh the cached formula-name index and the OCI token
//! cache are left to their own TTLs (§4.3); this just forces the
//! formula index refetch ahead of its TTL, the way a user expects
//! `update` to "go check for new things" on demand.

use clap::{ArgMatches, Command};
use thiserror::Error;

use crate::metadata::formula;
use crate::paths::{ConfigError, Layout};

pub fn command() -> Command {
    Command::new("update").about("Refresh cached package metadata")
}

pub fn handle(_args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let cache_path = layout.api_cache_dir().join("formula_names.json");
    let _ = std::fs::remove_file(&cache_path);

    let hits = formula::search(layout, "").unwrap_or_default();
    println!("refreshed index ({} known formulae)", hits.len());
    Ok(true)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}
