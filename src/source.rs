// SPDX-License-Identifier: MPL-2.0

//! Bridges between the metadata client (§4.3) and the resolver's
//! [`DescriptorSource`](crate::resolver::DescriptorSource) trait, so the
//! resolver stays agnostic to whether names come from the Homebrew
//! formula API or a prefetched APT index.

use std::collections::HashMap;

use crate::descriptor::Descriptor;
use crate::metadata::apt::{self, AptPackage};
use crate::metadata::{self, formula};
use crate::paths::Layout;
use crate::resolver::{DescriptorSource, FetchError};

/// Fetches formula descriptors one name at a time from the Homebrew
/// formula API, as the resolver's BFS frontier expansion expects.
pub struct FormulaSource<'a> {
    layout: &'a Layout,
}

impl<'a> FormulaSource<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }
}

impl DescriptorSource for FormulaSource<'_> {
    fn fetch(&self, name: &str) -> Result<Descriptor, FetchError> {
        formula::fetch_descriptor(self.layout, name).map_err(|e| FetchError(e.to_string()))
    }
}

/// An APT `Packages` index, fetched and parsed once up front (the wire
/// format has no per-name endpoint), then served to the resolver as a
/// name-keyed lookup.
pub struct AptSource {
    mirror: String,
    by_name: HashMap<String, AptPackage>,
}

impl AptSource {
    pub fn load(layout: &Layout, mirror: &str, dist: &str, component: &str, arch: &str) -> Result<Self, metadata::Error> {
        let body = apt::fetch_package_index(layout, mirror, dist, component, arch)?;
        let by_name = apt::parse_packages(&body).into_iter().map(|p| (p.package.clone(), p)).collect();
        Ok(Self { mirror: mirror.to_string(), by_name })
    }
}

impl DescriptorSource for AptSource {
    fn fetch(&self, name: &str) -> Result<Descriptor, FetchError> {
        let pkg = self
            .by_name
            .get(name)
            .ok_or_else(|| FetchError(format!("no such package: {name}")))?;
        Ok(apt::into_descriptor(&self.mirror, pkg))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn apt_source_resolves_known_package() {
        let by_name: HashMap<String, AptPackage> = [(
            "curl".to_string(),
            AptPackage {
                package: "curl".into(),
                version: "7.88.1-10".into(),
                depends: vec!["libc6".into()],
                filename: "pool/main/c/curl/curl_7.88.1-10_amd64.deb".into(),
                sha256: "deadbeef".into(),
                size: 1,
                description: "transfer data".into(),
            },
        )]
        .into_iter()
        .collect();
        let source = AptSource { mirror: "http://archive.ubuntu.com/ubuntu".into(), by_name };

        let descriptor = source.fetch("curl").unwrap();
        assert_eq!(descriptor.archive_url(), Some("http://archive.ubuntu.com/ubuntu/pool/main/c/curl/curl_7.88.1-10_amd64.deb"));
    }

    #[test]
    fn apt_source_reports_unknown_package() {
        let source = AptSource { mirror: "http://archive.ubuntu.com/ubuntu".into(), by_name: HashMap::new() };
        assert!(source.fetch("mystery").is_err());
    }
}
