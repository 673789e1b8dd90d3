// SPDX-License-Identifier: MPL-2.0

//! `upgrade [--cask] [<name>...]` and `outdated` (§6, B3): both walk
//! the same "fetch current metadata, compare to the installed record"
//! logic; `upgrade` additionally reinstalls anything that's behind.

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::db::{Database, KegRecord};
use crate::install::Orchestrator;
use crate::metadata::cask as cask_metadata;
use crate::metadata::formula;
use crate::paths::{ConfigError, Layout};
use crate::resolver;

const ARG_NAME: &str = "NAME";
const FLAG_CASK: &str = "cask";

pub fn command() -> Command {
    Command::new("upgrade")
        .about("Upgrade installed packages")
        .long_about("Upgrade all packages (or the given names) to their latest versions")
        .arg(Arg::new(ARG_NAME).num_args(0..).action(ArgAction::Append))
        .arg(Arg::new(FLAG_CASK).long("cask").action(ArgAction::SetTrue))
}

pub fn outdated_command() -> Command {
    Command::new("outdated")
        .about("List installed packages with a newer version available")
        .arg(Arg::new(ARG_NAME).num_args(0..).action(ArgAction::Append))
}

struct Candidate {
    record: KegRecord,
    latest: String,
}

fn candidates(db: &Database, layout: &Layout, names: &[&String]) -> Vec<(KegRecord, Result<String, Error>)> {
    db.list()
        .iter()
        .filter(|k| names.is_empty() || names.iter().any(|n| n.as_str() == k.name))
        .map(|k| (k.clone(), formula::fetch_descriptor(layout, &k.name).map(|d| d.effective_version()).map_err(Error::from)))
        .collect()
}

fn outdated(db: &Database, layout: &Layout, names: &[&String]) -> (Vec<Candidate>, Vec<(String, bool)>, bool) {
    let mut stale = Vec::new();
    let mut pinned_skipped = Vec::new();
    let mut all_ok = true;

    for (record, latest) in candidates(db, layout, names) {
        match latest {
            Ok(latest) if latest != record.version => {
                if record.pinned {
                    pinned_skipped.push((record.name.clone(), true));
                } else {
                    stale.push(Candidate { record, latest });
                }
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("nanobrew: {}: {e}", record.name);
                all_ok = false;
            }
        }
    }

    (stale, pinned_skipped, all_ok)
}

pub fn handle_outdated(args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let db = Database::open(layout)?;
    let names: Vec<&String> = args.get_many::<String>(ARG_NAME).into_iter().flatten().collect();

    let (stale, _pinned, all_ok) = outdated(&db, layout, &names);
    for candidate in &stale {
        println!("{} {} < {}", candidate.record.name, candidate.record.version, candidate.latest);
    }
    Ok(all_ok)
}

pub fn handle(args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let names: Vec<&String> = args.get_many::<String>(ARG_NAME).into_iter().flatten().collect();

    if args.get_flag(FLAG_CASK) {
        return upgrade_casks(layout, &names);
    }

    let mut db = Database::open(layout)?;
    let (stale, pinned_skipped, mut all_ok) = outdated(&db, layout, &names);

    for (name, _) in &pinned_skipped {
        println!("{name} [pinned, skipping]");
    }

    if stale.is_empty() {
        if all_ok {
            println!("already up to date");
        }
        return Ok(all_ok);
    }

    for candidate in stale {
        let name = candidate.record.name.clone();
        match resolver::resolve(std::slice::from_ref(&name), &crate::source::FormulaSource::new(layout)) {
            Ok(descriptors) => {
                let outcomes = Orchestrator::new(layout).install(&descriptors);
                for outcome in outcomes {
                    if outcome.succeeded() {
                        if outcome.already_recorded(&db) {
                            continue;
                        }
                        if let Some(actual_version) = outcome.actual_version {
                            db.record_install(&outcome.name, &actual_version, &outcome.sha256, super::now_epoch())?;
                            println!("Upgraded {} to {actual_version}", outcome.name);
                        }
                    } else {
                        eprintln!("nanobrew: {}: {}", outcome.name, outcome.error.unwrap_or_default());
                        all_ok = false;
                    }
                }
            }
            Err(e) => {
                eprintln!("nanobrew: {name}: {e}");
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

fn upgrade_casks(layout: &Layout, names: &[&String]) -> Result<bool, Error> {
    let mut db = Database::open(layout)?;
    let tokens: Vec<String> = db
        .list_casks()
        .iter()
        .filter(|c| names.is_empty() || names.iter().any(|n| n.as_str() == c.token))
        .map(|c| c.token.clone())
        .collect();

    let mut all_ok = true;
    for token in tokens {
        match cask_metadata::fetch_cask(layout, &token) {
            Ok(descriptor) => {
                let current = db.find_cask(&token).map(|c| c.version.clone()).unwrap_or_default();
                if descriptor.version != current {
                    println!("{token}: {current} -> {} (run `install --cask {token}` to fetch it)", descriptor.version);
                } else {
                    println!("{token} already up to date");
                }
            }
            Err(e) => {
                eprintln!("nanobrew: {token}: {e}");
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("db: {0}")]
    Db(#[from] crate::db::Error),
    #[error("metadata: {0}")]
    Metadata(#[from] crate::metadata::Error),
    #[error("resolve: {0}")]
    Resolve(#[from] resolver::Error),
}
