// SPDX-License-Identifier: MPL-2.0

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::cleanup;
use crate::db::Database;
use crate::paths::{ConfigError, Layout};

const FLAG_DRY_RUN: &str = "dry-run";
const FLAG_ALL: &str = "all";

pub fn command() -> Command {
    Command::new("cleanup")
        .about("Garbage-collect orphaned blobs and store entries")
        .arg(Arg::new(FLAG_DRY_RUN).long("dry-run").action(ArgAction::SetTrue))
        .arg(Arg::new(FLAG_ALL).long("all").action(ArgAction::SetTrue).help("Also drop removed-but-retained history blobs"))
}

pub fn handle(args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let db = Database::open(layout)?;
    let report = cleanup::cleanup(layout, &db, args.get_flag(FLAG_DRY_RUN), args.get_flag(FLAG_ALL))?;

    let verb = if report.dry_run { "Would remove" } else { "Removed" };
    for sha in &report.removed_blobs {
        println!("{verb} blob {sha}");
    }
    for sha in &report.removed_store_entries {
        println!("{verb} store entry {sha}");
    }
    if report.removed_blobs.is_empty() && report.removed_store_entries.is_empty() {
        println!("nothing to clean up");
    }
    Ok(true)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("db: {0}")]
    Db(#[from] crate::db::Error),
    #[error("cleanup: {0}")]
    Cleanup(#[from] cleanup::Error),
}
