// SPDX-License-Identifier: MPL-2.0

//! Bearer-token auth for OCI-registry-backed bottle endpoints.
//!
//! GHCR and similar registries require a short-lived pull token fetched
//! from a `www-authenticate`-style token endpoint before a blob GET.
//! Tokens are cached on disk keyed by scope, with TTL judged by file
//! mtime (§4.2: 4 minutes).

use std::fs;
use std::time::{Duration, SystemTime};

use serde::Deserialize;
use url::Url;

use crate::paths::Layout;

use super::Error;

const TOKEN_TTL: Duration = Duration::from_secs(4 * 60);

/// Registries whose blob path shape implies OCI bearer-token auth.
/// `ghcr.io/v2/<repo>/blobs/...` and ilk.
pub fn scope_for_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if !host.contains("ghcr.io") && !host.ends_with(".docker.io") && !host.contains("pkg.dev") {
        return None;
    }
    let path = parsed.path();
    let idx = path.find("/v2/")?;
    let rest = &path[idx + 4..];
    let repo = rest.split("/blobs/").next().or_else(|| rest.split("/manifests/").next())?;
    Some(format!("repository:{repo}:pull"))
}

fn cache_key(scope: &str) -> String {
    scope.replace('/', "_")
}

pub fn pull_token(layout: &Layout, scope: &str) -> Result<String, Error> {
    let cache_path = layout.token_cache_dir().join(cache_key(scope));

    if let Ok(meta) = fs::metadata(&cache_path) {
        if let Ok(modified) = meta.modified() {
            if SystemTime::now().duration_since(modified).unwrap_or(Duration::MAX) < TOKEN_TTL {
                if let Ok(token) = fs::read_to_string(&cache_path) {
                    return Ok(token.trim().to_string());
                }
            }
        }
    }

    let registry = scope.split(':').nth(1).unwrap_or_default();
    let token_url = format!(
        "https://{}/token?service={}&scope={}",
        registry_host(registry),
        registry_host(registry),
        scope
    );

    let body = super::get_to_memory(&token_url, &super::Headers::default())?;
    let parsed: TokenResponse = serde_json::from_slice(&body).map_err(|_| Error::Status(0, token_url))?;

    if let Some(parent) = cache_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = fs::write(&cache_path, &parsed.token);

    Ok(parsed.token)
}

fn registry_host(_repo: &str) -> &'static str {
    "ghcr.io"
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "access_token")]
    token: String,
}
