// SPDX-License-Identifier: MPL-2.0

//! Content-addressable blob cache: `cache/blobs/<sha256>`, keyed by the
//! expected hash and published atomically.

use std::path::PathBuf;

use crate::http::{self, Headers};
use crate::paths::Layout;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("network: {0}")]
    Network(#[from] http::Error),
}

pub fn has(layout: &Layout, sha256: &str) -> bool {
    layout.blob_path(sha256).is_file()
}

pub fn path_of(layout: &Layout, sha256: &str) -> PathBuf {
    layout.blob_path(sha256)
}

/// No-op if the blob is already cached; otherwise downloads with
/// streaming integrity verification. Safe under concurrent callers: a
/// racing second writer that finds the destination already present
/// (via [`http::get_to_file`]'s idempotent-if-exists check) treats it
/// as success.
pub fn ensure(layout: &Layout, url: &str, sha256: &str, headers: &Headers) -> Result<(), Error> {
    if has(layout, sha256) {
        return Ok(());
    }

    let dest = layout.blob_path(sha256);
    http::get_to_file(url, &dest, headers, Some(sha256))?;
    Ok(())
}
