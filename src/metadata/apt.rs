// SPDX-License-Identifier: MPL-2.0

//! APT `Packages` index: fetch and parse RFC-822 paragraph form.

use crate::descriptor::{Artifact, Descriptor};
use crate::paths::Layout;

use super::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptPackage {
    pub package: String,
    pub version: String,
    pub depends: Vec<String>,
    pub filename: String,
    pub sha256: String,
    pub size: u64,
    pub description: String,
}

pub fn fetch_package_index(
    layout: &Layout,
    mirror: &str,
    dist: &str,
    component: &str,
    arch: &str,
) -> Result<Vec<u8>, Error> {
    let url = format!("{mirror}/dists/{dist}/{component}/binary-{arch}/Packages");
    let cache_key = format!("apt_{dist}_{component}_{arch}.index");
    super::cached_get(layout, &cache_key, &url)
}

/// Parse an RFC-822 paragraph-form `Packages` index: paragraphs are
/// separated by a blank line, fields are `Key: value` with continuation
/// lines indented by at least one space.
pub fn parse_packages(body: &[u8]) -> Vec<AptPackage> {
    let text = String::from_utf8_lossy(body);
    let mut packages = Vec::new();

    for paragraph in text.split("\n\n") {
        if paragraph.trim().is_empty() {
            continue;
        }
        let fields = parse_fields(paragraph);

        let package = match fields.get("Package") {
            Some(p) => p.clone(),
            None => continue,
        };
        let version = fields.get("Version").cloned().unwrap_or_default();
        let filename = fields.get("Filename").cloned().unwrap_or_default();
        let sha256 = fields.get("SHA256").cloned().unwrap_or_default();
        let size = fields.get("Size").and_then(|s| s.parse().ok()).unwrap_or(0);
        let description = fields.get("Description").cloned().unwrap_or_default();
        let depends = fields.get("Depends").map(|d| parse_depends(d)).unwrap_or_default();

        packages.push(AptPackage { package, version, depends, filename, sha256, size, description });
    }

    packages
}

fn parse_fields(paragraph: &str) -> std::collections::HashMap<String, String> {
    let mut fields = std::collections::HashMap::new();
    let mut current_key: Option<String> = None;

    for line in paragraph.lines() {
        if let Some(rest) = line.strip_prefix(' ').or_else(|| line.strip_prefix('\t')) {
            if let Some(key) = &current_key {
                if let Some(existing) = fields.get_mut(key) {
                    let existing: &mut String = existing;
                    existing.push('\n');
                    existing.push_str(rest.trim());
                }
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_string();
            fields.insert(key.clone(), value.trim().to_string());
            current_key = Some(key);
        }
    }

    fields
}

/// `Depends` parsing: comma-separated clauses; each clause is a
/// `|`-separated alternatives list from which the first is chosen;
/// version constraints (`(>= 1.2)`) and arch qualifiers (`:any`) are
/// stripped.
fn parse_depends(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|clause| {
            let first_alt = clause.split('|').next()?;
            let name = first_alt
                .split(|c: char| c == '(' || c == '[')
                .next()
                .unwrap_or(first_alt)
                .trim();
            let name = name.split(':').next().unwrap_or(name).trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

/// Bridge an APT package record into the common [`Descriptor`] shape
/// used by the resolver and installer.
pub fn into_descriptor(apt_base_url: &str, pkg: &AptPackage) -> Descriptor {
    Descriptor {
        name: pkg.package.clone(),
        version: pkg.version.clone(),
        rebuild: 0,
        desc: pkg.description.clone(),
        dependencies: pkg.depends.clone(),
        artifact: Artifact::Binary {
            url: format!("{apt_base_url}/{}", pkg.filename),
            sha256: pkg.sha256.clone(),
        },
        caveats: None,
        post_install_defined: false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = "Package: curl\nVersion: 7.88.1-10\nDepends: libc6 (>= 2.34), libcurl4 (= 7.88.1-10) | libcurl3-gnutls, zlib1g:any\nFilename: pool/main/c/curl/curl_7.88.1-10_amd64.deb\nSHA256: deadbeef\nSize: 12345\nDescription: command line tool for transferring data\n\nPackage: wget\nVersion: 1.21.3-1\nFilename: pool/main/w/wget/wget_1.21.3-1_amd64.deb\nSHA256: cafef00d\nSize: 999\nDescription: retrieves files from the web\n";

    #[test]
    fn parses_multiple_paragraphs() {
        let pkgs = parse_packages(SAMPLE.as_bytes());
        assert_eq!(pkgs.len(), 2);
        assert_eq!(pkgs[0].package, "curl");
        assert_eq!(pkgs[1].package, "wget");
    }

    #[test]
    fn depends_picks_first_alternative_and_strips_constraints() {
        let pkgs = parse_packages(SAMPLE.as_bytes());
        assert_eq!(pkgs[0].depends, vec!["libc6", "libcurl4", "zlib1g"]);
    }
}
