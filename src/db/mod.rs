// SPDX-License-Identifier: MPL-2.0

//! Persisted install state: a single JSON document at `db/state.json`
//! holding keg and cask records. Unknown on-disk fields round-trip
//! unchanged so a newer writer never clobbers a field an older reader
//! didn't understand.

use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::paths::Layout;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed state document: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub version: String,
    pub sha256: String,
    pub installed_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KegRecord {
    pub name: String,
    pub version: String,
    pub sha256: String,
    #[serde(default)]
    pub pinned: bool,
    pub installed_at: i64,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    /// Fields neither read nor written by this version, preserved
    /// verbatim on round-trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaskRecord {
    pub token: String,
    pub version: String,
    #[serde(default)]
    pub apps: Vec<String>,
    #[serde(default)]
    pub binaries: Vec<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateDocument {
    #[serde(default)]
    pub kegs: Vec<KegRecord>,
    #[serde(default)]
    pub casks: Vec<CaskRecord>,
    /// Records dropped by `record_removal`, retained here (full history
    /// included) purely so `cleanup` can still protect their blobs; see
    /// [`Database::list_removed`].
    #[serde(default)]
    pub removed: Vec<KegRecord>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Owns the in-memory document and persists it back on every mutation.
pub struct Database<'a> {
    layout: &'a Layout,
    doc: StateDocument,
}

impl<'a> Database<'a> {
    /// Read `db/state.json` if it exists, else start from an empty document.
    pub fn open(layout: &'a Layout) -> Result<Self, Error> {
        let path = layout.state_db_path();
        let doc = if path.is_file() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            StateDocument::default()
        };
        Ok(Self { layout, doc })
    }

    pub fn find(&self, name: &str) -> Option<&KegRecord> {
        self.doc.kegs.iter().find(|k| k.name == name)
    }

    pub fn find_cask(&self, token: &str) -> Option<&CaskRecord> {
        self.doc.casks.iter().find(|c| c.token == token)
    }

    pub fn list(&self) -> &[KegRecord] {
        &self.doc.kegs
    }

    pub fn list_casks(&self) -> &[CaskRecord] {
        &self.doc.casks
    }

    /// Records removed by [`Database::record_removal`], kept around
    /// (with their history intact) so a non-`--all` `cleanup` run still
    /// treats their blobs as reachable (§4.11, P6).
    pub fn list_removed(&self) -> &[KegRecord] {
        &self.doc.removed
    }

    /// Replace any existing record for `name`, pushing its prior
    /// `{version, sha256, installed_at}` onto the new record's history.
    pub fn record_install(&mut self, name: &str, version: &str, sha256: &str, installed_at: i64) -> Result<(), Error> {
        let mut history = Vec::new();
        if let Some(pos) = self.doc.kegs.iter().position(|k| k.name == name) {
            let previous = self.doc.kegs.remove(pos);
            history = previous.history;
            history.push(HistoryEntry {
                version: previous.version,
                sha256: previous.sha256,
                installed_at: previous.installed_at,
            });
        }

        self.doc.kegs.push(KegRecord {
            name: name.to_string(),
            version: version.to_string(),
            sha256: sha256.to_string(),
            pinned: false,
            installed_at,
            history,
            extra: serde_json::Map::new(),
        });

        self.persist()
    }

    /// Remove `name`'s active record, moving it (history intact) onto
    /// the `removed` bucket so `cleanup` without `--all` still protects
    /// its blob and store entry (§4.11, P6, S6).
    pub fn record_removal(&mut self, name: &str) -> Result<(), Error> {
        if let Some(pos) = self.doc.kegs.iter().position(|k| k.name == name) {
            let record = self.doc.kegs.remove(pos);
            self.doc.removed.retain(|k| k.name != name);
            self.doc.removed.push(record);
        }
        self.persist()
    }

    /// Swap `name`'s active record with its most recent history entry
    /// (B4, S5). Returns `None` without writing anything if `name`
    /// isn't installed or its history is empty.
    pub fn rollback(&mut self, name: &str) -> Result<Option<HistoryEntry>, Error> {
        let Some(keg) = self.doc.kegs.iter_mut().find(|k| k.name == name) else {
            return Ok(None);
        };
        let Some(previous) = keg.history.pop() else {
            return Ok(None);
        };

        let demoted = HistoryEntry {
            version: std::mem::replace(&mut keg.version, previous.version.clone()),
            sha256: std::mem::replace(&mut keg.sha256, previous.sha256.clone()),
            installed_at: std::mem::replace(&mut keg.installed_at, previous.installed_at),
        };
        keg.history.push(demoted);

        self.persist()?;
        Ok(Some(previous))
    }

    pub fn set_pinned(&mut self, name: &str, pinned: bool) -> Result<(), Error> {
        if let Some(keg) = self.doc.kegs.iter_mut().find(|k| k.name == name) {
            keg.pinned = pinned;
        }
        self.persist()
    }

    pub fn record_cask_install(&mut self, token: &str, version: &str, apps: Vec<String>, binaries: Vec<String>) -> Result<(), Error> {
        self.doc.casks.retain(|c| c.token != token);
        self.doc.casks.push(CaskRecord {
            token: token.to_string(),
            version: version.to_string(),
            apps,
            binaries,
            extra: serde_json::Map::new(),
        });
        self.persist()
    }

    pub fn record_cask_removal(&mut self, token: &str) -> Result<(), Error> {
        self.doc.casks.retain(|c| c.token != token);
        self.persist()
    }

    /// Write-all-then-rename so a reader never observes a truncated file.
    fn persist(&self) -> Result<(), Error> {
        let path = self.layout.state_db_path();
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&self.doc)?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
