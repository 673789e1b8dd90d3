// SPDX-License-Identifier: MPL-2.0

//! Homebrew formula JSON: fetch and permissive parse into a [`Descriptor`].

use serde_json::Value;

use crate::descriptor::{Artifact, Descriptor};
use crate::paths::Layout;

use super::{Error, SearchHit};

const API_BASE: &str = "https://formulae.brew.sh/api/formula";

/// Platform tags tried in order until one has a bottle file. The current
/// platform's tag is tried first, then a descending compatibility chain.
fn platform_aliases() -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        &["arm64_sonoma", "arm64_ventura", "arm64_monterey", "sonoma", "ventura", "monterey", "x86_64_linux"]
    }
    #[cfg(not(target_os = "macos"))]
    {
        &["x86_64_linux", "arm64_linux"]
    }
}

pub fn fetch_descriptor(_layout: &Layout, name: &str) -> Result<Descriptor, Error> {
    let url = format!("{API_BASE}/{name}.json");
    let body = crate::http::get_to_memory(&url, &crate::http::Headers::default())
        .map_err(|_| Error::NotFound(name.to_string()))?;

    parse_formula(name, &body)
}

pub fn search(layout: &Layout, query: &str) -> Result<Vec<SearchHit>, Error> {
    let body = super::cached_get(layout, "formula_names.json", &format!("{API_BASE}.json"))?;
    let value: Value = serde_json::from_slice(&body).map_err(|e| Error::Malformed("formula index".into(), e.to_string()))?;

    let items = value.as_array().ok_or_else(|| Error::Malformed("formula index".into(), "expected array".into()))?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?;
            if !name.contains(query) {
                return None;
            }
            let version = item.get("versions")?.get("stable")?.as_str().unwrap_or_default();
            let desc = item.get("desc").and_then(Value::as_str).unwrap_or_default();
            Some(SearchHit {
                name: name.to_string(),
                version: version.to_string(),
                desc: desc.to_string(),
                kind: super::Kind::Formula,
            })
        })
        .collect())
}

fn parse_formula(name: &str, body: &[u8]) -> Result<Descriptor, Error> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| Error::Malformed(name.to_string(), e.to_string()))?;

    let version = value
        .get("versions")
        .and_then(|v| v.get("stable"))
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Malformed(name.to_string(), "missing versions.stable".into()))?
        .to_string();

    let revision = value.get("revision").and_then(Value::as_u64).unwrap_or(0);

    let desc = value.get("desc").and_then(Value::as_str).unwrap_or_default().to_string();

    let dependencies = value
        .get("dependencies")
        .and_then(Value::as_array)
        .map(|deps| {
            deps.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let caveats = value.get("caveats").and_then(Value::as_str).map(str::to_string);
    let post_install_defined = value.get("post_install_defined").and_then(Value::as_bool).unwrap_or(false);

    let (artifact, rebuild) = match find_bottle(&value) {
        Some((url, sha256, bottle_rebuild)) => (Artifact::Binary { url, sha256 }, bottle_rebuild),
        None => {
            let source = value
                .get("urls")
                .and_then(|u| u.get("stable"))
                .ok_or_else(|| Error::Malformed(name.to_string(), "no binary bottle and no source urls.stable".into()))?;
            let url = source
                .get("url")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::Malformed(name.to_string(), "missing urls.stable.url".into()))?
                .to_string();
            let sha256 = source
                .get("checksum")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            (Artifact::Source { url, sha256 }, revision)
        }
    };

    Ok(Descriptor {
        name: name.to_string(),
        version,
        rebuild,
        desc,
        dependencies,
        artifact,
        caveats,
        post_install_defined,
    })
}

/// Find a bottle file for the current platform, falling back through
/// [`platform_aliases`] before declaring "no binary".
fn find_bottle(value: &Value) -> Option<(String, String, u64)> {
    let files = value.get("bottle")?.get("stable")?.get("files")?;
    let bottle_rebuild = value
        .get("bottle")
        .and_then(|b| b.get("stable"))
        .and_then(|s| s.get("rebuild"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    for tag in platform_aliases() {
        if let Some(file) = files.get(tag) {
            let url = file.get("url")?.as_str()?.to_string();
            let sha256 = file.get("sha256")?.as_str()?.to_string();
            return Some((url, sha256, bottle_rebuild));
        }
    }

    None
}
