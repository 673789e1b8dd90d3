// SPDX-License-Identifier: MPL-2.0

//! Fetches and parses package metadata: Homebrew-style formula/cask
//! JSON and APT `Packages` index text.

pub mod apt;
pub mod cask;
pub mod formula;

use std::fs;
use std::time::{Duration, SystemTime};

use crate::paths::Layout;

const LIST_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// A single search hit across formula/cask/apt package kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub name: String,
    pub version: String,
    pub desc: String,
    pub kind: Kind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Formula,
    Cask,
    Apt,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed metadata for {0}: {1}")]
    Malformed(String, String),
    #[error("network: {0}")]
    Network(#[from] crate::http::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Read a cached full-list endpoint body if younger than the TTL,
/// else fetch, cache, and return it.
pub(crate) fn cached_get(layout: &Layout, cache_key: &str, url: &str) -> Result<Vec<u8>, Error> {
    let path = layout.api_cache_dir().join(cache_key);

    if let Ok(meta) = fs::metadata(&path) {
        if let Ok(modified) = meta.modified() {
            if SystemTime::now().duration_since(modified).unwrap_or(Duration::MAX) < LIST_CACHE_TTL {
                if let Ok(body) = fs::read(&path) {
                    return Ok(body);
                }
            }
        }
    }

    let body = crate::http::get_to_memory(url, &crate::http::Headers::default())?;
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = fs::write(&path, &body);
    Ok(body)
}

/// Search across all configured backends (best-effort: a backend that
/// errors is skipped rather than aborting the whole search).
pub fn search(layout: &Layout, query: &str) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    if let Ok(formula_hits) = formula::search(layout, query) {
        hits.extend(formula_hits);
    }
    hits
}
