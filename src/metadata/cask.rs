// SPDX-License-Identifier: MPL-2.0

//! Homebrew cask JSON: fetch and permissive parse.

use serde_json::Value;

use crate::cask::{Artifact, CaskDescriptor, Sha256Check};
use crate::paths::Layout;

use super::Error;

const API_BASE: &str = "https://formulae.brew.sh/api/cask";

pub fn fetch_cask(_layout: &Layout, token: &str) -> Result<CaskDescriptor, Error> {
    let url = format!("{API_BASE}/{token}.json");
    let body = crate::http::get_to_memory(&url, &crate::http::Headers::default())
        .map_err(|_| Error::NotFound(token.to_string()))?;
    parse_cask(token, &body)
}

fn parse_cask(token: &str, body: &[u8]) -> Result<CaskDescriptor, Error> {
    let value: Value = serde_json::from_slice(body).map_err(|e| Error::Malformed(token.to_string(), e.to_string()))?;

    let name = value
        .get("name")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let version = value
        .get("version")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Malformed(token.to_string(), "missing version".into()))?
        .to_string();

    let url = value
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Malformed(token.to_string(), "missing url".into()))?
        .to_string();

    let sha256 = match value.get("sha256").and_then(Value::as_str) {
        Some("no_check") | None => Sha256Check::NoCheck,
        Some(hash) => Sha256Check::Hash(hash.to_string()),
    };

    let artifacts = value
        .get("artifacts")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_artifact).collect())
        .unwrap_or_default();

    Ok(CaskDescriptor { token: token.to_string(), name, version, url, sha256, artifacts })
}

fn parse_artifact(value: &Value) -> Option<Artifact> {
    let obj = value.as_object()?;
    if let Some(app) = obj.get("app").and_then(Value::as_str) {
        return Some(Artifact::App { target: app.to_string() });
    }
    if let Some(binary) = obj.get("binary") {
        let (target, symlink) = match binary {
            Value::String(s) => (s.clone(), None),
            Value::Array(arr) => {
                let target = arr.first()?.as_str()?.to_string();
                let symlink = arr.get(1).and_then(Value::as_str).map(str::to_string);
                (target, symlink)
            }
            _ => return None,
        };
        return Some(Artifact::Binary { target, symlink });
    }
    if let Some(pkg) = obj.get("pkg").and_then(Value::as_str) {
        return Some(Artifact::Pkg { target: pkg.to_string() });
    }
    if let Some(uninstall) = obj.get("uninstall") {
        return Some(Artifact::Uninstall { description: uninstall.to_string() });
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = r#"{
        "token": "some-app",
        "name": ["Some App"],
        "version": "1.2.3",
        "url": "https://example.test/some-app.dmg",
        "sha256": "no_check",
        "artifacts": [
            {"app": "Some App.app"},
            {"binary": ["Some App.app/Contents/MacOS/cli", "someapp"]},
            {"pkg": "extras.pkg"},
            {"uninstall": {"quit": "com.example.someapp"}}
        ]
    }"#;

    #[test]
    fn parses_heterogeneous_artifacts() {
        let cask = parse_cask("some-app", SAMPLE.as_bytes()).unwrap();
        assert_eq!(cask.version, "1.2.3");
        assert_eq!(cask.sha256, Sha256Check::NoCheck);
        assert_eq!(cask.artifacts.len(), 4);
        assert!(matches!(cask.artifacts[0], Artifact::App { .. }));
        assert!(matches!(&cask.artifacts[1], Artifact::Binary { symlink: Some(s), .. } if s == "someapp"));
    }
}
