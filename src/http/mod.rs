// SPDX-License-Identifier: MPL-2.0

//! Blocking HTTP client: GET-to-memory, GET-to-file with streaming
//! checksum verification, and OCI-registry bearer token auth.

mod oci;

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::redirect::Policy;
use sha2::{Digest, Sha256};

use crate::paths::Layout;

pub use oci::OciAuth;

const MAX_REDIRECTS: usize = 5;
const ANCILLARY_TIMEOUT: Duration = Duration::from_secs(3);

fn shared_client() -> &'static Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .expect("build reqwest client")
    })
}

#[derive(Debug, Default, Clone)]
pub struct Headers(pub Vec<(String, String)>);

impl Headers {
    pub fn bearer(token: &str) -> Self {
        Headers(vec![("Authorization".into(), format!("Bearer {token}"))])
    }
}

fn send(url: &str, headers: &Headers, timeout: Option<Duration>) -> Result<Response, Error> {
    let mut req = shared_client().get(url);
    for (k, v) in &headers.0 {
        req = req.header(k, v);
    }
    if let Some(t) = timeout {
        req = req.timeout(t);
    }
    let response = req.send().map_err(Error::Transport)?;
    if !response.status().is_success() {
        return Err(Error::Status(response.status().as_u16(), url.to_string()));
    }
    Ok(response)
}

/// GET a resource fully into memory.
pub fn get_to_memory(url: &str, headers: &Headers) -> Result<Vec<u8>, Error> {
    let response = send(url, headers, None)?;
    response.bytes().map(|b| b.to_vec()).map_err(Error::Transport)
}

/// GET a resource with a short timeout, for ancillary requests (version
/// checks and similar) per the §5 ≤3s bound.
pub fn get_to_memory_ancillary(url: &str) -> Result<Vec<u8>, Error> {
    let response = send(url, &Headers::default(), Some(ANCILLARY_TIMEOUT))?;
    response.bytes().map(|b| b.to_vec()).map_err(Error::Transport)
}

/// Stream a resource to `dest_path`, verifying its digest incrementally
/// if `expected_sha256` is given. Pre-existing `dest_path` is treated as
/// success. Publication is atomic (write to a sibling temp file, rename
/// over `dest_path`); on checksum mismatch the temp file is unlinked and
/// nothing is published.
pub fn get_to_file(
    url: &str,
    dest_path: &Path,
    headers: &Headers,
    expected_sha256: Option<&str>,
) -> Result<(), Error> {
    if dest_path.exists() {
        return Ok(());
    }

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent).map_err(Error::Io)?;
    }

    let tmp_path = dest_path.with_extension(format!("partial-{}", std::process::id()));
    let mut response = send(url, headers, None)?;

    let mut hasher = Sha256::new();
    {
        let mut tmp_file = File::create(&tmp_path).map_err(Error::Io)?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = response.read(&mut buf).map_err(Error::Transport)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            tmp_file.write_all(&buf[..n]).map_err(Error::Io)?;
        }
        tmp_file.flush().map_err(Error::Io)?;
    }

    if let Some(expected) = expected_sha256 {
        let computed = hex::encode(hasher.finalize());
        if !computed.eq_ignore_ascii_case(expected) {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::ChecksumMismatch {
                expected: expected.to_string(),
                computed,
            });
        }
    }

    fs::rename(&tmp_path, dest_path).map_err(Error::Io)?;
    Ok(())
}

/// Resolve bearer-token auth for OCI-style blob endpoints, caching the
/// scoped pull token under `cache/tokens/<scope-escaped>` for 4 minutes.
pub fn oci_headers_for(layout: &Layout, url: &str) -> Result<Headers, Error> {
    match oci::scope_for_url(url) {
        Some(scope) => {
            let token = oci::pull_token(layout, &scope)?;
            Ok(Headers::bearer(&token))
        }
        None => Ok(Headers::default()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("network transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("non-200 response ({0}) fetching {1}")]
    Status(u16, String),
    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch { expected: String, computed: String },
    #[error("io: {0}")]
    Io(#[source] io::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn preexisting_dest_is_idempotent_success() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("blob");
        fs::write(&dest, b"already here").unwrap();
        // No network call happens because dest already exists.
        let result = get_to_file("http://127.0.0.1:1/unreachable", &dest, &Headers::default(), None);
        assert!(result.is_ok());
    }

    #[test]
    fn bearer_headers_format() {
        let h = Headers::bearer("tok123");
        assert_eq!(h.0[0], ("Authorization".to_string(), "Bearer tok123".to_string()));
    }

    #[test]
    fn unreachable_host_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("blob");
        let err = get_to_file("http://127.0.0.1:1/unreachable", &dest, &Headers::default(), None)
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        let mut f = std::fs::File::create(dir.path().join("marker")).unwrap();
        let _ = f.write_all(b"x");
    }
}
