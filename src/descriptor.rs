// SPDX-License-Identifier: MPL-2.0

//! Package identity and the immutable [`Descriptor`] metadata record.

use std::fmt;

/// A package name. Opaque beyond byte equality.
pub type Name = String;

/// Parsed, immutable metadata for one package. Owned by the resolver
/// for the lifetime of an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: Name,
    pub version: String,
    pub rebuild: u64,
    pub desc: String,
    pub dependencies: Vec<Name>,
    pub artifact: Artifact,
    pub caveats: Option<String>,
    pub post_install_defined: bool,
}

/// Either a pre-built binary archive or a source tarball. Exactly one
/// variant is ever constructed for a given descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Binary { url: String, sha256: String },
    Source { url: String, sha256: String },
}

impl Descriptor {
    /// `version` when `rebuild == 0`, else `version + "_" + rebuild`.
    pub fn effective_version(&self) -> String {
        if self.rebuild == 0 {
            self.version.clone()
        } else {
            format!("{}_{}", self.version, self.rebuild)
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.artifact, Artifact::Binary { .. })
    }

    pub fn archive_url(&self) -> Option<&str> {
        match &self.artifact {
            Artifact::Binary { url, .. } => Some(url),
            Artifact::Source { .. } => None,
        }
    }

    pub fn archive_sha256(&self) -> Option<&str> {
        match &self.artifact {
            Artifact::Binary { sha256, .. } => Some(sha256),
            Artifact::Source { .. } => None,
        }
    }

    pub fn source_url(&self) -> Option<&str> {
        match &self.artifact {
            Artifact::Source { url, .. } => Some(url),
            Artifact::Binary { .. } => None,
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.effective_version())
    }
}
