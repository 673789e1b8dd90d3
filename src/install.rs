// SPDX-License-Identifier: MPL-2.0

//! The install orchestrator (C12): per-package phase state machine,
//! fan-out across OS threads, and error aggregation. Drives
//! C2 (fetch) → C5 (blob cache) → C7 (extract) → C6 (store) →
//! C8 (materialize) → C9 (relocate) → C10 (link) in sequence per
//! package, publishing phase transitions through C13 (§4.12).

use std::thread;

use crate::cache;
use crate::descriptor::Descriptor;
use crate::http;
use crate::link;
use crate::materialize;
use crate::paths::Layout;
use crate::postinstall;
use crate::progress::{self, Phase};
use crate::relocate;
use crate::store;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} has no pre-built binary artifact (source builds are not implemented)")]
    NoBinaryArtifact(String),
    #[error("network: {0}")]
    Network(#[from] http::Error),
    #[error("blob cache: {0}")]
    Cache(#[from] cache::Error),
    #[error("extract/store: {0}")]
    Store(#[from] store::Error),
    #[error("materialize: {0}")]
    Materialize(#[from] materialize::Error),
    #[error("link: {0}")]
    Link(#[from] link::Error),
}

/// Outcome of attempting to install one descriptor. `actual_version` is
/// set whenever a keg ended up materialized, whether just now or
/// previously (`skipped`) — the orchestrator's caller needs it to write
/// the database record (§4.12 step 6, §4.8's "actual version" caveat).
#[derive(Debug, Clone)]
pub struct Outcome {
    pub name: String,
    pub sha256: String,
    pub actual_version: Option<String>,
    pub skipped: bool,
    pub error: Option<String>,
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// True when this outcome is the warm/already-materialized path
    /// (`skipped`) *and* `db` already holds a record matching its
    /// `{version, sha256}` — i.e. recording it again would be a pure
    /// no-op write. Callers use this to keep a repeated `install`/
    /// `upgrade` of an up-to-date package from growing `history` or
    /// stamping a fresh `installed_at` on every run (L2).
    pub fn already_recorded(&self, db: &crate::db::Database<'_>) -> bool {
        let Some(actual_version) = &self.actual_version else { return false };
        self.skipped && db.find(&self.name).is_some_and(|k| &k.version == actual_version && k.sha256 == self.sha256)
    }
}

/// Drives the install pipeline for a topologically-sorted descriptor
/// list against one [`Layout`]. Stateless beyond the layout reference —
/// constructed fresh per top-level `install`/`upgrade` invocation.
pub struct Orchestrator<'a> {
    layout: &'a Layout,
}

impl<'a> Orchestrator<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Install every descriptor not already materialized at a matching
    /// version, in parallel (one OS thread per remaining package), then
    /// return outcomes in the same order as `descriptors`. Does not
    /// touch the state database — callers persist results serially
    /// afterward (§5: DB writes are single-writer, after all workers
    /// join).
    pub fn install(&self, descriptors: &[Descriptor]) -> Vec<Outcome> {
        let mut outcomes: Vec<Option<Outcome>> = descriptors.iter().map(|_| None).collect();
        let mut pending: Vec<usize> = Vec::new();

        for (i, descriptor) in descriptors.iter().enumerate() {
            if let Some(actual_version) = materialize::already_materialized(self.layout, &descriptor.name, &descriptor.version) {
                outcomes[i] = Some(Outcome {
                    name: descriptor.name.clone(),
                    sha256: descriptor.archive_sha256().unwrap_or_default().to_string(),
                    actual_version: Some(actual_version),
                    skipped: true,
                    error: None,
                });
            } else {
                pending.push(i);
            }
        }

        if !pending.is_empty() {
            let names: Vec<String> = pending.iter().map(|&i| descriptors[i].name.clone()).collect();
            let channel = progress::Channel::new(names);
            let layout = self.layout;

            let results = thread::scope(|scope| {
                let renderer = scope.spawn(|| progress::render(&channel));

                let worker_handles: Vec<_> = pending
                    .iter()
                    .enumerate()
                    .map(|(slot, &idx)| {
                        let handle = channel.handle(slot);
                        let descriptor = &descriptors[idx];
                        scope.spawn(move || run_pipeline(layout, descriptor, &handle))
                    })
                    .collect();

                let results: Vec<Outcome> = worker_handles
                    .into_iter()
                    .map(|h| h.join().expect("install worker thread panicked"))
                    .collect();

                renderer.join().expect("progress renderer thread panicked");
                results
            });

            for (slot, &idx) in pending.iter().enumerate() {
                outcomes[idx] = Some(results[slot].clone());
            }
        }

        outcomes.into_iter().map(|o| o.expect("every descriptor index is filled")).collect()
    }
}

fn run_pipeline(layout: &Layout, descriptor: &Descriptor, handle: &progress::Handle<'_>) -> Outcome {
    let sha256 = descriptor.archive_sha256().unwrap_or_default().to_string();

    let result = (|| -> Result<String, Error> {
        let url = descriptor.archive_url().ok_or_else(|| Error::NoBinaryArtifact(descriptor.name.clone()))?;

        handle.set(Phase::Downloading);
        let headers = http::oci_headers_for(layout, url)?;
        cache::ensure(layout, url, &sha256, &headers)?;

        handle.set(Phase::Extracting);
        let blob_path = cache::path_of(layout, &sha256);
        store::ensure(layout, &blob_path, &sha256)?;

        handle.set(Phase::Installing);
        let actual_version = materialize::materialize(layout, &sha256, &descriptor.name, &descriptor.version)?;
        let keg_dir = layout.keg_dir(&descriptor.name, &actual_version);

        handle.set(Phase::Relocating);
        if let Err(e) = relocate::relocate(layout, &keg_dir) {
            log::warn!("relocate warning for {}: {e}", descriptor.name);
        }
        if let Err(e) = postinstall::run(descriptor, &keg_dir) {
            log::warn!("post-install warning for {}: {e}", descriptor.name);
        }

        handle.set(Phase::Linking);
        link::link(layout, &descriptor.name, &actual_version)?;

        Ok(actual_version)
    })();

    match result {
        Ok(actual_version) => {
            handle.set(Phase::Done);
            Outcome { name: descriptor.name.clone(), sha256, actual_version: Some(actual_version), skipped: false, error: None }
        }
        Err(e) => {
            log::error!("{}: {e}", descriptor.name);
            handle.set(Phase::Failed);
            Outcome { name: descriptor.name.clone(), sha256, actual_version: None, skipped: false, error: Some(e.to_string()) }
        }
    }
}
