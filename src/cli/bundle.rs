// SPDX-License-Identifier: MPL-2.0

//! `bundle dump|install [file]` (L1): writes/reads a Brewfile-style
//! manifest. `bundle install` drives the same per-name install path as
//! the top-level `install` command.

use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::bundle::{self, Manifest};
use crate::db::Database;
use crate::install::Orchestrator;
use crate::paths::{ConfigError, Layout};
use crate::resolver;
use crate::source::FormulaSource;

const ARG_FILE: &str = "FILE";

pub fn command() -> Command {
    Command::new("bundle")
        .about("Dump or install from a Brewfile-style manifest")
        .subcommand_required(true)
        .subcommand(Command::new("dump").arg(file_arg()))
        .subcommand(Command::new("install").arg(file_arg()))
}

fn file_arg() -> Arg {
    Arg::new(ARG_FILE).num_args(1).action(ArgAction::Set)
}

fn path_from(args: &ArgMatches) -> PathBuf {
    args.get_one::<String>(ARG_FILE).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(bundle::DEFAULT_FILENAME))
}

pub fn handle(args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    match args.subcommand() {
        Some(("dump", sub)) => dump(&path_from(sub), layout),
        Some(("install", sub)) => install(&path_from(sub), layout),
        _ => unreachable!("clap enforces subcommand_required"),
    }
}

fn dump(path: &Path, layout: &Layout) -> Result<bool, Error> {
    let db = Database::open(layout)?;
    bundle::write(path, &db)?;
    println!("wrote {}", path.display());
    Ok(true)
}

fn install(path: &Path, layout: &Layout) -> Result<bool, Error> {
    let Manifest { formulae, casks } = bundle::read(path)?;
    let source = FormulaSource::new(layout);
    let mut db = Database::open(layout)?;
    let mut all_ok = true;

    for name in &formulae {
        match resolver::resolve(std::slice::from_ref(name), &source) {
            Ok(descriptors) => {
                for outcome in Orchestrator::new(layout).install(&descriptors) {
                    if outcome.succeeded() {
                        if let Some(actual_version) = &outcome.actual_version {
                            db.record_install(&outcome.name, actual_version, &outcome.sha256, super::now_epoch())?;
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

    if !casks.is_empty() {
        println!("skipping {} cask(s): `bundle install` only drives formulae, run `install --cask <token>` for each", casks.len());
    }

    Ok(all_ok)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("db: {0}")]
    Db(#[from] crate::db::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("resolve: {0}")]
    Resolve(#[from] resolver::Error),
}
